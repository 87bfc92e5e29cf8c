//! Execution context handed to command handlers.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::connection::{Connection, Namespace, QuotedRef};
use crate::context::GroupContext;
use crate::message::InboundMessage;

/// A registered command body.
///
/// Handlers may do anything; the router imposes no return-value contract
/// beyond surfacing `Err` as a logged `HandlerFailed` event. A handler
/// failure is invisible to the user unless the handler reported it
/// itself.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, msg: &InboundMessage, ctx: &CommandContext) -> Result<()>;
}

/// Normalized execution context assembled by the router for one
/// dispatch.
pub struct CommandContext {
    pub conn: Arc<dyn Connection>,
    pub namespace: Namespace,
    pub chat_id: String,
    /// Decoded sender JID.
    pub sender_jid: String,
    pub command: String,
    pub args: Vec<String>,
    pub used_prefix: String,
    pub is_group: bool,
    pub is_owner: bool,
    pub sender_is_admin: bool,
    pub bot_is_admin: bool,
    /// Group snapshot, present only when the handler required admin
    /// gating and resolution succeeded.
    pub group: Option<Arc<GroupContext>>,
    pub mentioned_jids: Vec<String>,
    pub(crate) reply_to: QuotedRef,
}

impl CommandContext {
    /// Arguments re-joined as one string.
    pub fn arg_text(&self) -> String {
        self.args.join(" ")
    }

    /// Reply in-thread to the original message. Falls back to an
    /// unquoted send; failures are swallowed (commands reply
    /// best-effort, the router never retries).
    pub async fn reply(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if self
            .conn
            .send_text(&self.chat_id, text, Some(self.reply_to.clone()))
            .await
            .is_ok()
        {
            return;
        }
        if let Err(err) = self.conn.send_text(&self.chat_id, text, None).await {
            debug!(chat = %self.chat_id, error = %err, "reply failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockConnection;

    fn ctx_for(conn: Arc<MockConnection>) -> CommandContext {
        let msg = InboundMessage::new("m1", "chat@g.us", "u@s.whatsapp.net", ".ping");
        CommandContext {
            conn,
            namespace: Namespace::Main,
            chat_id: msg.chat_id.clone(),
            sender_jid: "u@s.whatsapp.net".into(),
            command: "ping".into(),
            args: vec!["a".into(), "b".into()],
            used_prefix: ".".into(),
            is_group: true,
            is_owner: false,
            sender_is_admin: false,
            bot_is_admin: false,
            group: None,
            mentioned_jids: Vec::new(),
            reply_to: msg.quote_ref(),
        }
    }

    #[test]
    fn test_arg_text() {
        let conn = Arc::new(MockConnection::main("bot@s.whatsapp.net"));
        assert_eq!(ctx_for(conn).arg_text(), "a b");
    }

    #[tokio::test]
    async fn test_reply_quotes_original() {
        let conn = Arc::new(MockConnection::main("bot@s.whatsapp.net"));
        ctx_for(Arc::clone(&conn)).reply("pong").await;

        let sent = conn.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "pong");
        assert!(matches!(
            sent[0].quoted,
            Some(QuotedRef::Message { ref id, .. }) if id == "m1"
        ));
    }

    #[tokio::test]
    async fn test_reply_falls_back_unquoted() {
        let conn = Arc::new(MockConnection::main("bot@s.whatsapp.net").fail_quoted_sends());
        ctx_for(Arc::clone(&conn)).reply("pong").await;

        let sent = conn.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].quoted.is_none());
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_no_op() {
        let conn = Arc::new(MockConnection::main("bot@s.whatsapp.net"));
        ctx_for(Arc::clone(&conn)).reply("   ").await;
        assert!(conn.sent().is_empty());
    }
}
