//! Meridian - Chat Event Routing and Moderation Core
//!
//! Protocol-agnostic routing core for multi-session chat bots: message
//! deduplication, command parsing and dispatch, permission gating,
//! per-sender rate limiting and antilink moderation, partitioned per
//! session namespace.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - TTL caching with Moka (dedup, rate limit, group context)
//! - `connection` - Transport contract and identity types
//! - `message` - Normalized inbound message
//! - `settings` - Per-chat persisted flags and strike counters
//! - `context` - Group membership/admin resolution with caching
//! - `permissions` - Command gating policy
//! - `router` - Command table and the dispatch pipeline
//! - `moderation` - Antilink strike escalation
//! - `primary` - Primary-session pinning per chat
//! - `events` - Broadcast channel of routing decisions
//! - `utils` - JID helpers
//!
//! The embedder owns the actual socket and wraps it in [`Connection`];
//! everything above that trait lives here.

pub mod cache;
pub mod config;
pub mod connection;
pub mod context;
pub mod events;
pub mod message;
pub mod moderation;
pub mod permissions;
pub mod primary;
pub mod router;
pub mod settings;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheConfig, CacheRegistry, TypedCache};
pub use config::Config;
pub use connection::{
    AdminTag, Connection, ConnectionIdentity, ContactCard, DeleteRef, GroupMetadata, Namespace,
    Participant, QuotedRef,
};
pub use context::{ContextResolver, GroupContext, ResolvedContext};
pub use events::{EventSink, RouterEvent};
pub use message::InboundMessage;
pub use moderation::{
    AdminHints, ModerationAction, ModerationEngine, ModerationOutcome, SkipReason,
};
pub use permissions::{Denial, Requirements};
pub use primary::PrimaryRegistry;
pub use router::{
    CommandContext, CommandHandler, CommandRegistry, CommandSpec, RegistryBuilder, RegistryError,
    Router,
};
pub use settings::{MemorySettings, SettingsStore};
