//! Moderation engine (antilink).
//!
//! Independent pipeline invoked for every non-command group message.
//! Detects shared invite links, deletes the offending message when
//! possible, tracks per-user strike counts in the external settings
//! store, and escalates from warning to removal at the configured
//! strike limit.
//!
//! Every outbound side effect here is best-effort: deletion gets one
//! retry with the raw message key, notices fall back from the quoted
//! system contact to a plain send, and a messaging failure never
//! unwinds an action that already happened.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::{Connection, ContactCard, QuotedRef};
use crate::context::ContextResolver;
use crate::message::InboundMessage;
use crate::settings::SettingsStore;

static INVITE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    // two accepted forms: chat-invite URL and channel URL
    Regex::new(
        r"(?i)(?:https?://)?(?:www\.)?(?:chat\.whatsapp\.com/[A-Za-z0-9]+|whatsapp\.com/channel/[A-Za-z0-9]+)",
    )
    .expect("invite link pattern")
});

/// Extract all invite-link matches from a message body.
pub fn extract_invite_links(text: &str) -> Vec<String> {
    INVITE_LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Admin flags the caller already knows, so the engine only resolves
/// what is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminHints {
    pub sender_is_admin: bool,
    pub bot_is_admin: bool,
}

/// Action the engine took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Warn,
    Kick,
}

/// Why the engine declined to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BotOff,
    AntilinkOff,
    Owner,
    Admin,
}

/// Structured result of one moderation pass. Intended for
/// observability, not for further automated branching.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModerationOutcome {
    pub acted: bool,
    pub action: Option<ModerationAction>,
    pub skipped: Option<SkipReason>,
    pub strikes: u32,
    pub deleted: bool,
    pub links: Vec<String>,
}

impl ModerationOutcome {
    fn none() -> Self {
        Self::default()
    }

    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// The antilink strike state machine.
#[derive(Clone)]
pub struct ModerationEngine {
    config: Arc<Config>,
    settings: Arc<dyn SettingsStore>,
    resolver: ContextResolver,
}

impl ModerationEngine {
    pub fn new(
        config: Arc<Config>,
        settings: Arc<dyn SettingsStore>,
        resolver: ContextResolver,
    ) -> Self {
        Self {
            config,
            settings,
            resolver,
        }
    }

    /// Run the moderation pipeline for one message.
    pub async fn apply(
        &self,
        conn: &dyn Connection,
        msg: &InboundMessage,
        hints: AdminHints,
    ) -> ModerationOutcome {
        if !msg.is_group() {
            return ModerationOutcome::none();
        }
        let chat_id = msg.chat_id.as_str();
        let namespace = conn.identity().namespace.clone();

        // a settings-store failure leaves the bot flag at its default
        // (on) and the antilink flag at its default (off)
        if !self
            .settings
            .is_bot_enabled(chat_id, &namespace)
            .await
            .unwrap_or(true)
        {
            return ModerationOutcome::skipped(SkipReason::BotOff);
        }
        if !self
            .settings
            .is_antilink_enabled(chat_id, &namespace)
            .await
            .unwrap_or(false)
        {
            return ModerationOutcome::skipped(SkipReason::AntilinkOff);
        }

        let sender = conn.decode_jid(&msg.sender_jid);
        if sender.is_empty() {
            return ModerationOutcome::none();
        }

        let links = extract_invite_links(&msg.raw_text);
        if links.is_empty() {
            return ModerationOutcome::none();
        }

        if self.resolver.is_owner(conn, &sender) {
            return ModerationOutcome::skipped(SkipReason::Owner);
        }

        let mut sender_is_admin = hints.sender_is_admin;
        let mut bot_is_admin = hints.bot_is_admin;
        if !sender_is_admin || !bot_is_admin {
            let resolved = self.resolver.resolve(conn, chat_id, &sender, true).await;
            sender_is_admin = sender_is_admin || resolved.sender_is_admin;
            bot_is_admin = bot_is_admin || resolved.bot_is_admin;
        }

        // admins are exempt outright: no strike, no reply
        if sender_is_admin {
            return ModerationOutcome::skipped(SkipReason::Admin);
        }

        let mut deleted = false;
        if bot_is_admin {
            deleted = self.delete_offending(conn, msg, &sender).await;
        }

        let count = match self
            .settings
            .bump_antilink_strike(chat_id, &sender, &namespace)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(chat = chat_id, error = %err, "strike bump failed");
                0
            }
        };

        let limit = self.config.antilink_strike_limit;
        if count >= limit {
            if bot_is_admin {
                match conn.remove_participants(chat_id, &[sender.clone()]).await {
                    Ok(()) => {
                        // the counter resets only once the removal
                        // actually happened
                        if let Err(err) = self
                            .settings
                            .reset_antilink_strike(chat_id, &sender, &namespace)
                            .await
                        {
                            warn!(chat = chat_id, error = %err, "strike reset failed");
                        }
                        self.send_notice(
                            conn,
                            chat_id,
                            &format!("Antilink: {limit}/{limit} strikes reached. User removed."),
                            &sender,
                        )
                        .await;
                        return ModerationOutcome {
                            acted: true,
                            action: Some(ModerationAction::Kick),
                            skipped: None,
                            strikes: limit,
                            deleted,
                            links,
                        };
                    }
                    Err(err) => {
                        // counter kept, so the next offense retries the
                        // removal
                        warn!(chat = chat_id, user = %sender, error = %err, "removal failed");
                        self.send_notice(
                            conn,
                            chat_id,
                            &format!(
                                "Antilink: {limit}/{limit} strikes reached, but removing the user failed."
                            ),
                            &sender,
                        )
                        .await;
                        return ModerationOutcome {
                            acted: true,
                            action: Some(ModerationAction::Warn),
                            skipped: None,
                            strikes: count,
                            deleted,
                            links,
                        };
                    }
                }
            }

            // no permission to remove: the counter is left as-is
            let tail = if deleted { "" } else { " nor delete the message" };
            self.send_notice(
                conn,
                chat_id,
                &format!(
                    "Antilink: {limit}/{limit} strikes reached, but I am not admin to remove the user{tail}."
                ),
                &sender,
            )
            .await;
            return ModerationOutcome {
                acted: true,
                action: Some(ModerationAction::Warn),
                skipped: None,
                strikes: count,
                deleted,
                links,
            };
        }

        let text = if !bot_is_admin && !deleted {
            format!(
                "Antilink: link detected, but I cannot delete it without admin. Warning {count}/{limit}."
            )
        } else {
            let verb = if deleted { "deleted" } else { "detected" };
            format!("Antilink: link {verb}. Warning {count}/{limit}.")
        };
        self.send_notice(conn, chat_id, &text, &sender).await;

        ModerationOutcome {
            acted: true,
            action: Some(ModerationAction::Warn),
            skipped: None,
            strikes: count,
            deleted,
            links,
        }
    }

    /// Delete the offending message: primary reference first, one retry
    /// with the raw key, then give up.
    async fn delete_offending(
        &self,
        conn: &dyn Connection,
        msg: &InboundMessage,
        sender: &str,
    ) -> bool {
        let Some(primary) = msg.delete_ref(sender) else {
            return false;
        };
        if conn.delete_message(&msg.chat_id, &primary).await.is_ok() {
            return true;
        }
        debug!(chat = %msg.chat_id, id = %msg.id, "delete retry with raw key");
        conn.delete_message(&msg.chat_id, &msg.raw_key())
            .await
            .is_ok()
    }

    /// Send a moderation notice quoting the synthesized system contact;
    /// fall back to a plain send; swallow both failures.
    async fn send_notice(&self, conn: &dyn Connection, chat_id: &str, text: &str, sender: &str) {
        let card = ContactCard::system(&self.config.moderation_contact_name, sender);
        if conn
            .send_text(chat_id, text, Some(QuotedRef::SystemContact(card)))
            .await
            .is_ok()
        {
            return;
        }
        if let Err(err) = conn.send_text(chat_id, text, None).await {
            warn!(chat = chat_id, error = %err, "moderation notice failed");
        }
    }
}
