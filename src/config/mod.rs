//! Configuration module.
//!
//! Explicit configuration passed into the router and resolver instead of
//! ambient globals. Loads from environment variables, with sensible
//! defaults for embedding.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Global default command prefix. Per-namespace overrides come from
    /// the settings store.
    pub command_prefix: String,

    /// Owner JIDs. These users bypass admin gating and are exempt from
    /// moderation.
    pub owner_jids: Vec<String>,

    /// Commands that stay available while the bot is disabled for a chat
    /// (escape hatches like `unbanchat`).
    pub allow_when_disabled: HashSet<String>,

    /// Strike count at which antilink escalates to removal.
    pub antilink_strike_limit: u32,

    /// Bound on group metadata fetches.
    pub metadata_timeout: Duration,

    /// Display name of the synthesized contact moderation notices quote.
    pub moderation_contact_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_prefix: ".".to_string(),
            owner_jids: Vec::new(),
            allow_when_disabled: HashSet::from(["unbanchat".to_string()]),
            antilink_strike_limit: 3,
            metadata_timeout: Duration::from_secs(8),
            moderation_contact_name: "Antilink".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables: `COMMAND_PREFIX`, `OWNER_JIDS`
    /// (comma-separated), `ANTILINK_STRIKE_LIMIT`,
    /// `MODERATION_CONTACT_NAME`. Everything is optional.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(prefix) = env::var("COMMAND_PREFIX") {
            let prefix = prefix.trim().to_string();
            if !prefix.is_empty() {
                config.command_prefix = prefix;
            }
        }

        config.owner_jids = env::var("OWNER_JIDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(limit) = env::var("ANTILINK_STRIKE_LIMIT")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
        {
            config.antilink_strike_limit = limit;
        }

        if let Ok(name) = env::var("MODERATION_CONTACT_NAME") {
            let name = name.trim().to_string();
            if !name.is_empty() {
                config.moderation_contact_name = name;
            }
        }

        config
    }
}
