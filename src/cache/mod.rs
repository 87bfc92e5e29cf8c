//! Cache module - Modular caching system using Moka.
//!
//! One generic TTL cache component backs the three hot-path sets the
//! router needs, each with its own TTL and key namespace:
//!
//! - message dedup (120 s horizon)
//! - per-sender command rate limiting (1.5 s window)
//! - group membership/admin-role snapshots (15 s staleness window)
//!
//! ## Architecture
//!
//! The cache system follows a registry pattern:
//! - `CacheRegistry` - Central registry holding all named caches
//! - `CacheConfig` - Per-cache capacity/TTL configuration with presets
//! - `TypedCache` - Typed wrapper over a Moka sync cache
//!
//! Expiry is lazy: a read past the TTL is a miss, never a stale value.
//! Moka bounds memory growth on its own, so no sweeper task is needed.

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
