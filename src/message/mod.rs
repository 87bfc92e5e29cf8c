//! Normalized inbound message shape.
//!
//! The raw protocol payload is a deeply nested, duck-typed structure
//! (captions, quoted containers, button replies all carry the body in a
//! different place). Hosts normalize it once at the ingestion boundary
//! into this fixed shape; everything downstream only sees this.

use crate::connection::{DeleteRef, QuotedRef};
use crate::utils::is_group_jid;

/// One inbound chat event, immutable once received.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Protocol message id, unique per chat within the dedup horizon.
    pub id: String,

    /// Chat the message arrived in. Ends in the group-suffix marker for
    /// group chats.
    pub chat_id: String,

    /// JID of the sender, as reported by the transport.
    pub sender_jid: String,

    /// Extracted text body (conversation text, caption, selected button
    /// id - whichever the raw payload carried).
    pub raw_text: String,

    /// JIDs mentioned in the body.
    pub mentioned_jids: Vec<String>,

    /// Participant field from the raw message key, when present. Used to
    /// build delete references.
    pub participant_hint: Option<String>,

    /// True when this session sent the message itself.
    pub from_me: bool,

    /// Display name the sender was pushed with, if any.
    pub push_name: Option<String>,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_jid: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender_jid: sender_jid.into(),
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    /// Whether this message arrived in a group chat, computed
    /// syntactically from the chat id.
    pub fn is_group(&self) -> bool {
        is_group_jid(&self.chat_id)
    }

    /// Non-empty trimmed body, if any.
    pub fn body(&self) -> Option<&str> {
        let trimmed = self.raw_text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Delete reference preferring the raw key's participant, falling
    /// back to the resolved sender.
    pub fn delete_ref(&self, sender_fallback: &str) -> Option<DeleteRef> {
        if self.chat_id.is_empty() || self.id.is_empty() {
            return None;
        }
        let participant = self
            .participant_hint
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| (!sender_fallback.is_empty()).then(|| sender_fallback.to_string()));
        Some(DeleteRef {
            chat_id: self.chat_id.clone(),
            id: self.id.clone(),
            from_me: false,
            participant,
        })
    }

    /// Delete reference built from the raw key alone. Used as the retry
    /// form when the primary reference is rejected.
    pub fn raw_key(&self) -> DeleteRef {
        DeleteRef {
            chat_id: self.chat_id.clone(),
            id: self.id.clone(),
            from_me: self.from_me,
            participant: self.participant_hint.clone(),
        }
    }

    /// Quote reference for threaded replies to this message.
    pub fn quote_ref(&self) -> QuotedRef {
        QuotedRef::Message {
            chat_id: self.chat_id.clone(),
            id: self.id.clone(),
            participant: self.participant_hint.clone(),
        }
    }
}
