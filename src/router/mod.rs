//! Command router.
//!
//! Owns the command table and the dedup/rate-limit sets, and drives one
//! message through the pipeline:
//!
//! dedup → primary-session gate → prefix parse → bot-enabled gate
//! (with allow-list) → command lookup → rate limit → conditional
//! context resolve → permission gate → dispatch.
//!
//! Non-commands with a body are handed to the moderation engine
//! instead. The pipeline order is observable behavior: dedup and the
//! prefix parse happen before the enable gate, so a suppressed command
//! still counts against the dedup window; rate limiting and permission
//! checks happen after it.
//!
//! Nothing here propagates an error to the ingestion loop. Every
//! decision is traced and published on the event channel.

mod context;
mod parse;
mod registry;

pub use context::{CommandContext, CommandHandler};
pub use parse::{parse_command, ParsedCommand};
pub use registry::{
    CommandIndexEntry, CommandRegistry, CommandSpec, RegistryBuilder, RegistryError,
};

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::config::Config;
use crate::connection::{Connection, Namespace};
use crate::context::ContextResolver;
use crate::events::{EventSink, RouterEvent};
use crate::message::InboundMessage;
use crate::moderation::{AdminHints, ModerationEngine};
use crate::permissions;
use crate::primary::PrimaryRegistry;
use crate::settings::SettingsStore;
use crate::utils::shorten;

/// Process-wide router over one command table, shared by all
/// connections. All per-connection state is partitioned by namespace.
pub struct Router {
    config: Arc<Config>,
    settings: Arc<dyn SettingsStore>,
    resolver: ContextResolver,
    moderation: ModerationEngine,
    registry: RwLock<Arc<CommandRegistry>>,
    primary: Arc<PrimaryRegistry>,
    dedup: TypedCache<String, ()>,
    recent: TypedCache<String, ()>,
    events: EventSink,
}

impl Router {
    pub fn new(
        config: Arc<Config>,
        settings: Arc<dyn SettingsStore>,
        caches: &CacheRegistry,
        registry: CommandRegistry,
        primary: Arc<PrimaryRegistry>,
    ) -> Arc<Self> {
        let resolver = ContextResolver::new(Arc::clone(&config), caches);
        let moderation = ModerationEngine::new(
            Arc::clone(&config),
            Arc::clone(&settings),
            resolver.clone(),
        );
        let dedup = caches.get_or_create("message_dedup", CacheConfig::dedup());
        let recent = caches.get_or_create("command_rate_limit", CacheConfig::rate_limit());

        info!(commands = registry.len(), "router initialized");

        Arc::new(Self {
            config,
            settings,
            resolver,
            moderation,
            registry: RwLock::new(Arc::new(registry)),
            primary,
            dedup,
            recent,
            events: EventSink::default(),
        })
    }

    /// Replace the whole command table. Concurrent dispatches see either
    /// the old or the new table, never a partial one.
    pub fn reload(&self, registry: CommandRegistry) {
        info!(commands = registry.len(), "command table reloaded");
        *self.registry.write() = Arc::new(registry);
    }

    /// Subscribe to routing/moderation events.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    /// Launch handling on its own task so the ingestion loop is never
    /// blocked by a slow handler or metadata fetch.
    pub fn spawn(self: &Arc<Self>, conn: Arc<dyn Connection>, msg: InboundMessage) {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            router.handle(conn, msg).await;
        });
    }

    /// Drive one message through the pipeline to completion.
    pub async fn handle(&self, conn: Arc<dyn Connection>, msg: InboundMessage) {
        if msg.from_me || msg.chat_id.is_empty() {
            return;
        }

        let namespace = conn.identity().namespace.clone();

        // a message without an id cannot be deduplicated; it is
        // processed, not dropped
        if !msg.id.is_empty()
            && !self
                .dedup
                .insert_if_absent(format!("{namespace}:{}", msg.id), ())
        {
            debug!(%namespace, id = %msg.id, "dropped duplicate message");
            self.events.emit(RouterEvent::Duplicate {
                namespace,
                message_id: msg.id.clone(),
            });
            return;
        }

        if msg.is_group()
            && let Some(primary) = self.primary.primary_for(&msg.chat_id)
            && primary != namespace
        {
            debug!(chat = %msg.chat_id, %primary, "dropped: another session is primary");
            self.events.emit(RouterEvent::PrimaryMismatch {
                namespace,
                chat_id: msg.chat_id.clone(),
            });
            return;
        }

        let used_prefix = self.prefix_for(&namespace).await;
        let Some(parsed) = parse_command(&msg.raw_text, &used_prefix) else {
            if msg.body().is_some() {
                let outcome = self
                    .moderation
                    .apply(conn.as_ref(), &msg, AdminHints::default())
                    .await;
                self.events.emit(RouterEvent::Moderated(outcome));
            }
            return;
        };

        debug!(
            %namespace,
            chat = %msg.chat_id,
            command = %parsed.command,
            args = parsed.args.len(),
            text = %shorten(&msg.raw_text, 120),
            "command received"
        );

        // a settings-store failure leaves the bot enabled
        let enabled = self
            .settings
            .is_bot_enabled(&msg.chat_id, &namespace)
            .await
            .unwrap_or(true);
        if !enabled && !self.config.allow_when_disabled.contains(&parsed.command) {
            debug!(chat = %msg.chat_id, command = %parsed.command, "bot disabled for chat");
            self.events.emit(RouterEvent::BotDisabled {
                namespace,
                chat_id: msg.chat_id.clone(),
                command: parsed.command,
            });
            return;
        }

        let registry = Arc::clone(&self.registry.read());
        let Some(spec) = registry.get(&parsed.command) else {
            debug!(command = %parsed.command, "unknown command");
            self.events.emit(RouterEvent::UnknownCommand {
                namespace,
                command: parsed.command,
            });
            return;
        };

        let sender = conn.decode_jid(&msg.sender_jid);
        if !self.recent.insert_if_absent(
            format!("{namespace}:{sender}:{}", parsed.command),
            (),
        ) {
            debug!(command = %parsed.command, %sender, "rate limited");
            self.events.emit(RouterEvent::RateLimited {
                namespace,
                sender_jid: sender,
                command: parsed.command,
            });
            return;
        }

        // cost avoidance: fetch group metadata only when the handler's
        // gates actually need it
        let need_group_meta = msg.is_group() && spec.requirements().needs_group_meta();
        let resolved = self
            .resolver
            .resolve(conn.as_ref(), &msg.chat_id, &msg.sender_jid, need_group_meta)
            .await;

        if let Err(denial) = permissions::evaluate(spec.requirements(), &resolved) {
            self.deny(conn.as_ref(), &msg, &denial.to_string()).await;
            self.events.emit(RouterEvent::Denied {
                namespace,
                command: parsed.command,
                sender_jid: sender,
                reason: denial.to_string(),
            });
            return;
        }

        let ctx = CommandContext {
            conn: Arc::clone(&conn),
            namespace: namespace.clone(),
            chat_id: msg.chat_id.clone(),
            sender_jid: sender.clone(),
            command: parsed.command.clone(),
            args: parsed.args,
            used_prefix,
            is_group: resolved.is_group,
            is_owner: resolved.is_owner,
            sender_is_admin: resolved.sender_is_admin,
            bot_is_admin: resolved.bot_is_admin,
            group: resolved.group,
            mentioned_jids: msg.mentioned_jids.clone(),
            reply_to: msg.quote_ref(),
        };

        self.events.emit(RouterEvent::Dispatched {
            namespace: namespace.clone(),
            command: ctx.command.clone(),
            sender_jid: sender,
            chat_id: msg.chat_id.clone(),
        });

        if let Err(err) = spec.handler().handle(&msg, &ctx).await {
            error!(command = %ctx.command, error = %err, "handler failed");
            self.events.emit(RouterEvent::HandlerFailed {
                namespace,
                command: ctx.command.clone(),
                error: err.to_string(),
            });
        }
    }

    /// Effective prefix for a connection: per-namespace override from
    /// the settings store, else the configured default.
    async fn prefix_for(&self, namespace: &Namespace) -> String {
        self.settings
            .command_prefix(namespace)
            .await
            .ok()
            .flatten()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.config.command_prefix.clone())
    }

    /// Send a single denial reply; quoted first, plain fallback, errors
    /// swallowed.
    async fn deny(&self, conn: &dyn Connection, msg: &InboundMessage, text: &str) {
        if conn
            .send_text(&msg.chat_id, text, Some(msg.quote_ref()))
            .await
            .is_ok()
        {
            return;
        }
        if let Err(err) = conn.send_text(&msg.chat_id, text, None).await {
            debug!(chat = %msg.chat_id, error = %err, "denial reply failed");
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.registry.read().len())
            .field("dedup_entries", &self.dedup.entry_count())
            .finish()
    }
}
