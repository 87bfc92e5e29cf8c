//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// After this duration, entries are automatically evicted.
    pub ttl: Option<Duration>,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not accessed within this duration.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)), // 5 minutes
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set time-to-live for cache entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Set time-to-idle for cache entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }

    /// Message dedup set.
    ///
    /// Existence of a key within the horizon marks the message as already
    /// handled. High capacity because every inbound message lands here.
    pub fn dedup() -> Self {
        Self {
            max_capacity: 50_000,
            ttl: Some(Duration::from_secs(120)), // 2 minute horizon
            tti: None,
        }
    }

    /// Per-(namespace, sender, command) rate-limit set.
    ///
    /// A key within the window blocks a repeat of the same sender+command.
    pub fn rate_limit() -> Self {
        Self {
            max_capacity: 20_000,
            ttl: Some(Duration::from_millis(1500)),
            tti: None,
        }
    }

    /// Group membership/admin-role snapshots.
    ///
    /// Short TTL keeps the staleness window bounded; entries are replaced
    /// wholesale, never mutated in place.
    pub fn group_context() -> Self {
        Self {
            max_capacity: 5_000,
            ttl: Some(Duration::from_secs(15)),
            tti: None,
        }
    }
}
