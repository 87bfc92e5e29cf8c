//! Structured observability channel.
//!
//! The router never blocks ingestion and never propagates failures, so
//! every decision it takes is published here instead of silently
//! discarded. Subscribing is optional; emission is fire-and-forget.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::connection::Namespace;
use crate::moderation::ModerationOutcome;

/// One routing or moderation decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterEvent {
    /// Message already handled within the dedup horizon.
    Duplicate {
        namespace: Namespace,
        message_id: String,
    },

    /// Another session is pinned as primary for this chat.
    PrimaryMismatch {
        namespace: Namespace,
        chat_id: String,
    },

    /// Bot disabled for the chat and the command is not on the
    /// allow-list.
    BotDisabled {
        namespace: Namespace,
        chat_id: String,
        command: String,
    },

    /// Parsed as a command but nothing is registered under that name.
    UnknownCommand {
        namespace: Namespace,
        command: String,
    },

    /// Same sender+command inside the rate window; dropped, not queued.
    RateLimited {
        namespace: Namespace,
        sender_jid: String,
        command: String,
    },

    /// A permission gate failed; the denial reply was sent.
    Denied {
        namespace: Namespace,
        command: String,
        sender_jid: String,
        reason: String,
    },

    /// Handler invocation started.
    Dispatched {
        namespace: Namespace,
        command: String,
        sender_jid: String,
        chat_id: String,
    },

    /// Handler returned an error; caught at the dispatch boundary.
    HandlerFailed {
        namespace: Namespace,
        command: String,
        error: String,
    },

    /// The moderation engine ran for a non-command message.
    Moderated(ModerationOutcome),
}

/// Broadcast sender the router publishes events through.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<RouterEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Never blocks; with no subscribers the event is
    /// dropped.
    pub fn emit(&self, event: RouterEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(256)
    }
}
