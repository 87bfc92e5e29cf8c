//! External settings service contract.
//!
//! Feature flags, the per-connection command prefix and the antilink
//! strike counters live in an external key-value service, keyed by
//! (chat, namespace). The core only consumes this trait; `MemorySettings`
//! is a DashMap-backed implementation for tests and embedders without an
//! external store.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::connection::Namespace;

/// Settings and strike store consumed by the router and moderation
/// engine.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Whether the bot is enabled for this chat under this namespace.
    async fn is_bot_enabled(&self, chat_id: &str, namespace: &Namespace) -> Result<bool>;

    /// Whether the antilink feature is enabled for this chat.
    async fn is_antilink_enabled(&self, chat_id: &str, namespace: &Namespace) -> Result<bool>;

    /// Per-namespace command prefix override, if one is stored.
    async fn command_prefix(&self, namespace: &Namespace) -> Result<Option<String>>;

    /// Increment the antilink strike counter for (chat, user, namespace)
    /// and return the new count.
    async fn bump_antilink_strike(
        &self,
        chat_id: &str,
        user_jid: &str,
        namespace: &Namespace,
    ) -> Result<u32>;

    /// Reset the antilink strike counter to zero.
    async fn reset_antilink_strike(
        &self,
        chat_id: &str,
        user_jid: &str,
        namespace: &Namespace,
    ) -> Result<()>;
}

/// In-memory settings store.
///
/// Bot enablement defaults to on, antilink defaults to off (opt-in per
/// chat), matching the external service's defaults.
#[derive(Debug, Default)]
pub struct MemorySettings {
    bot_disabled: DashMap<String, ()>,
    antilink_on: DashMap<String, ()>,
    prefixes: DashMap<String, String>,
    strikes: DashMap<String, u32>,
}

fn chat_key(chat_id: &str, namespace: &Namespace) -> String {
    format!("{namespace}:{chat_id}")
}

fn strike_key(chat_id: &str, user_jid: &str, namespace: &Namespace) -> String {
    format!("{namespace}:{chat_id}:{user_jid}")
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bot_enabled(&self, chat_id: &str, namespace: &Namespace, enabled: bool) {
        let key = chat_key(chat_id, namespace);
        if enabled {
            self.bot_disabled.remove(&key);
        } else {
            self.bot_disabled.insert(key, ());
        }
    }

    pub fn set_antilink_enabled(&self, chat_id: &str, namespace: &Namespace, enabled: bool) {
        let key = chat_key(chat_id, namespace);
        if enabled {
            self.antilink_on.insert(key, ());
        } else {
            self.antilink_on.remove(&key);
        }
    }

    pub fn set_prefix(&self, namespace: &Namespace, prefix: impl Into<String>) {
        self.prefixes.insert(namespace.to_string(), prefix.into());
    }

    /// Current strike count, for inspection.
    pub fn strike_count(&self, chat_id: &str, user_jid: &str, namespace: &Namespace) -> u32 {
        self.strikes
            .get(&strike_key(chat_id, user_jid, namespace))
            .map(|c| *c)
            .unwrap_or(0)
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn is_bot_enabled(&self, chat_id: &str, namespace: &Namespace) -> Result<bool> {
        Ok(!self.bot_disabled.contains_key(&chat_key(chat_id, namespace)))
    }

    async fn is_antilink_enabled(&self, chat_id: &str, namespace: &Namespace) -> Result<bool> {
        Ok(self.antilink_on.contains_key(&chat_key(chat_id, namespace)))
    }

    async fn command_prefix(&self, namespace: &Namespace) -> Result<Option<String>> {
        Ok(self.prefixes.get(&namespace.to_string()).map(|p| p.clone()))
    }

    async fn bump_antilink_strike(
        &self,
        chat_id: &str,
        user_jid: &str,
        namespace: &Namespace,
    ) -> Result<u32> {
        let mut entry = self
            .strikes
            .entry(strike_key(chat_id, user_jid, namespace))
            .or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn reset_antilink_strike(
        &self,
        chat_id: &str,
        user_jid: &str,
        namespace: &Namespace,
    ) -> Result<()> {
        self.strikes
            .remove(&strike_key(chat_id, user_jid, namespace));
        Ok(())
    }
}
