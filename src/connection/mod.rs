//! Connection contract consumed by the router and moderation engine.
//!
//! The underlying chat-protocol connection (pairing, reconnection,
//! session storage) is owned by the embedder. The core only consumes the
//! small capability surface defined here: send, delete, group metadata,
//! participant removal and JID decoding. A host wraps its socket in this
//! trait; tests use a mock.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::{normalize_jid, strip_device};

/// Isolation key distinguishing the main connection from each
/// sub-connection.
///
/// All caches, rate limits and strike counters are partitioned by it, so
/// a main session and each sub-session have fully isolated state. String
/// form is `main` or `sub:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Namespace {
    Main,
    Sub(String),
}

impl Namespace {
    /// Parse a namespace key. Accepts the legacy `subbot:<id>` spelling
    /// used by older primary-session files.
    pub fn parse(input: &str) -> Option<Self> {
        let key = input.trim();
        if key.eq_ignore_ascii_case("main") {
            return Some(Self::Main);
        }
        let id = key
            .strip_prefix("sub:")
            .or_else(|| key.strip_prefix("subbot:"))?;
        let id = id.trim();
        let valid_len = !id.is_empty() && id.len() <= 20;
        if valid_len && id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Some(Self::Sub(id.to_string()));
        }
        None
    }

    pub fn is_sub(&self) -> bool {
        matches!(self, Self::Sub(_))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Sub(id) => write!(f, "sub:{id}"),
        }
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.to_string()
    }
}

impl TryFrom<String> for Namespace {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Namespace::parse(&value).ok_or_else(|| format!("invalid namespace key: {value:?}"))
    }
}

/// Identity of one logical connection.
#[derive(Debug, Clone)]
pub struct ConnectionIdentity {
    /// Primary JID of this session's own account.
    pub jid: String,

    /// Alternate id some transports report alongside the JID.
    pub alt_jid: Option<String>,

    /// Partition key for caches, rate limits and counters.
    pub namespace: Namespace,

    /// Designated owner of a sub-session, if any. Counts as an owner for
    /// permission gating under that session's namespace.
    pub owner_jid: Option<String>,
}

impl ConnectionIdentity {
    pub fn main(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            alt_jid: None,
            namespace: Namespace::Main,
            owner_jid: None,
        }
    }

    pub fn sub(jid: impl Into<String>, id: impl Into<String>, owner_jid: Option<String>) -> Self {
        Self {
            jid: jid.into(),
            alt_jid: None,
            namespace: Namespace::Sub(id.into()),
            owner_jid,
        }
    }

    /// All raw spellings that may identify this session in a participant
    /// list: the JID, the alternate id, and their device-stripped forms.
    pub fn candidate_jids(&self) -> Vec<String> {
        let mut out = Vec::new();
        for raw in [Some(self.jid.as_str()), self.alt_jid.as_deref()]
            .into_iter()
            .flatten()
        {
            if raw.is_empty() {
                continue;
            }
            out.push(raw.to_string());
            let stripped = strip_device(raw);
            if stripped != raw {
                out.push(stripped);
            }
        }
        out
    }
}

/// Admin role tag on a group participant.
///
/// Different data sources encode the same fact three ways: the role
/// strings `admin`/`superadmin`, or a plain boolean flag. All normalize
/// to one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminTag {
    Flag(bool),
    Role(String),
}

impl AdminTag {
    pub fn grants_admin(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Role(role) => matches!(role.as_str(), "admin" | "superadmin"),
        }
    }
}

/// One member of a group chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub jid: String,
    #[serde(default)]
    pub admin: Option<AdminTag>,
}

impl Participant {
    pub fn is_admin(&self) -> bool {
        self.admin.as_ref().is_some_and(AdminTag::grants_admin)
    }
}

/// Group metadata snapshot as reported by the connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupMetadata {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Reference identifying a message for deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRef {
    pub chat_id: String,
    pub id: String,
    pub from_me: bool,
    pub participant: Option<String>,
}

/// Synthesized contact-card identity used to quote moderation notices,
/// so they are visually distinct from command output.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactCard {
    pub display_name: String,
    pub vcard: String,
}

impl ContactCard {
    /// Build a system contact card carrying the offender's number.
    pub fn system(display_name: &str, sender_jid: &str) -> Self {
        let num = sender_jid.split('@').next().filter(|n| !n.is_empty()).unwrap_or("0");
        let vcard = format!(
            "BEGIN:VCARD\nVERSION:3.0\nFN:{display_name}\nN:{display_name};;;;\n\
             TEL;type=CELL;type=VOICE;waid={num}:+{num}\nEND:VCARD"
        );
        Self {
            display_name: display_name.to_string(),
            vcard,
        }
    }
}

/// What an outbound text is quoting, if anything.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotedRef {
    /// Quote a real message for a threaded reply.
    Message {
        chat_id: String,
        id: String,
        participant: Option<String>,
    },
    /// Quote a synthesized system identity.
    SystemContact(ContactCard),
}

/// Capability surface the core requires from a connection.
///
/// Every method that calls out to the wire is a potential long-latency
/// suspension point; callers treat failures as transient and degrade
/// rather than propagate.
#[async_trait]
pub trait Connection: Send + Sync {
    fn identity(&self) -> &ConnectionIdentity;

    /// Normalize a JID the way this transport does. Falls back to the
    /// generic normalizer.
    fn decode_jid(&self, jid: &str) -> String {
        normalize_jid(jid)
    }

    /// Fetch a group's metadata (subject + participant roles).
    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata>;

    /// Send a text message, optionally quoting another message or a
    /// synthesized contact.
    async fn send_text(&self, chat_id: &str, text: &str, quoted: Option<QuotedRef>) -> Result<()>;

    /// Delete a message for everyone.
    async fn delete_message(&self, chat_id: &str, key: &DeleteRef) -> Result<()>;

    /// Remove participants from a group.
    async fn remove_participants(&self, chat_id: &str, users: &[String]) -> Result<()>;
}
