//! Shared test doubles.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection::{
    Connection, ConnectionIdentity, DeleteRef, GroupMetadata, Participant, QuotedRef,
};
use crate::message::InboundMessage;
use crate::router::{CommandContext, CommandHandler};

pub fn participant(jid: &str, role: Option<&str>) -> Participant {
    Participant {
        jid: jid.to_string(),
        admin: role.map(|r| crate::connection::AdminTag::Role(r.to_string())),
    }
}

pub fn group_meta(subject: &str, participants: Vec<Participant>) -> GroupMetadata {
    GroupMetadata {
        subject: subject.to_string(),
        participants,
    }
}

/// One outbound text recorded by the mock.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub quoted: Option<QuotedRef>,
}

/// Scripted in-memory connection.
///
/// Records every outbound call; `group_metadata` serves the scripted
/// snapshot or fails when none was provided.
pub struct MockConnection {
    identity: ConnectionIdentity,
    metadata: Option<GroupMetadata>,
    metadata_calls: AtomicUsize,
    delete_attempts: AtomicUsize,
    fail_first_delete: AtomicBool,
    fail_all_deletes: AtomicBool,
    fail_quoted_sends: AtomicBool,
    fail_removals: AtomicBool,
    sent: Mutex<Vec<SentMessage>>,
    deletes: Mutex<Vec<DeleteRef>>,
    removals: Mutex<Vec<Vec<String>>>,
}

impl MockConnection {
    fn with_identity(identity: ConnectionIdentity) -> Self {
        Self {
            identity,
            metadata: None,
            metadata_calls: AtomicUsize::new(0),
            delete_attempts: AtomicUsize::new(0),
            fail_first_delete: AtomicBool::new(false),
            fail_all_deletes: AtomicBool::new(false),
            fail_quoted_sends: AtomicBool::new(false),
            fail_removals: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            removals: Mutex::new(Vec::new()),
        }
    }

    pub fn main(jid: &str) -> Self {
        Self::with_identity(ConnectionIdentity::main(jid))
    }

    pub fn sub(jid: &str, id: &str, owner_jid: &str) -> Self {
        let owner = (!owner_jid.is_empty()).then(|| owner_jid.to_string());
        Self::with_identity(ConnectionIdentity::sub(jid, id, owner))
    }

    pub fn with_metadata(mut self, metadata: GroupMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn fail_first_delete(self) -> Self {
        self.fail_first_delete.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_all_deletes(self) -> Self {
        self.fail_all_deletes.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_quoted_sends(self) -> Self {
        self.fail_quoted_sends.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_removals(self) -> Self {
        self.fail_removals.store(true, Ordering::SeqCst);
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Successfully delivered texts, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Every delete attempt, including failed ones.
    pub fn deletes(&self) -> Vec<DeleteRef> {
        self.deletes.lock().clone()
    }

    pub fn removals(&self) -> Vec<Vec<String>> {
        self.removals.lock().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    async fn group_metadata(&self, _chat_id: &str) -> Result<GroupMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        match &self.metadata {
            Some(metadata) => Ok(metadata.clone()),
            None => bail!("no group metadata scripted"),
        }
    }

    async fn send_text(&self, chat_id: &str, text: &str, quoted: Option<QuotedRef>) -> Result<()> {
        if quoted.is_some() && self.fail_quoted_sends.load(Ordering::SeqCst) {
            bail!("quoted send rejected");
        }
        self.sent.lock().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            quoted,
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: &str, key: &DeleteRef) -> Result<()> {
        let attempt = self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        self.deletes.lock().push(key.clone());
        if self.fail_all_deletes.load(Ordering::SeqCst) {
            bail!("delete rejected");
        }
        if attempt == 0 && self.fail_first_delete.load(Ordering::SeqCst) {
            bail!("delete rejected");
        }
        Ok(())
    }

    async fn remove_participants(&self, _chat_id: &str, users: &[String]) -> Result<()> {
        self.removals.lock().push(users.to_vec());
        if self.fail_removals.load(Ordering::SeqCst) {
            bail!("removal rejected");
        }
        Ok(())
    }
}

/// Snapshot of one dispatch as seen by a handler.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    pub command: String,
    pub args: Vec<String>,
    pub used_prefix: String,
    pub is_owner: bool,
    pub sender_is_admin: bool,
    pub bot_is_admin: bool,
}

/// Handler that records every invocation.
pub struct CountingHandler {
    calls: Mutex<Vec<HandlerCall>>,
    fail: bool,
}

impl CountingHandler {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    /// Variant whose `handle` always errors after recording.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandHandler for CountingHandler {
    async fn handle(&self, _msg: &InboundMessage, ctx: &CommandContext) -> Result<()> {
        self.calls.lock().push(HandlerCall {
            command: ctx.command.clone(),
            args: ctx.args.clone(),
            used_prefix: ctx.used_prefix.clone(),
            is_owner: ctx.is_owner,
            sender_is_admin: ctx.sender_is_admin,
            bot_is_admin: ctx.bot_is_admin,
        });
        if self.fail {
            bail!("handler exploded");
        }
        Ok(())
    }
}
