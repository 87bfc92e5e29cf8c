//! Named cache registry.
//!
//! The router, resolver and moderation engine obtain their caches by
//! name here, which keeps every cache an explicit, injectable service
//! instead of an ambient global. Handles to the same name share one
//! underlying store, so two routers built over the same registry also
//! share dedup and rate-limit state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

#[derive(Clone)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, Erased>>>,
}

/// Type-erased handle plus enough information to diagnose a mismatch.
struct Erased {
    cache: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch the cache registered under `name`, creating it with
    /// `config` on first use. A later caller's config is ignored; the
    /// first registration wins.
    ///
    /// # Panics
    /// Panics when `name` is already registered under different key or
    /// value types. Cache names are static within the crate, so a
    /// mismatch is a programming error, not a runtime condition.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.write();
        if let Some(existing) = caches.get(name) {
            return downcast(name, existing);
        }

        debug!(cache = name, "creating cache");
        let cache = TypedCache::new(name, config);
        caches.insert(
            name.to_string(),
            Erased {
                cache: Box::new(cache.clone()),
                type_id: TypeId::of::<TypedCache<K, V>>(),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );
        cache
    }

    /// Look up an already-registered cache.
    ///
    /// # Panics
    /// Panics on a key/value type mismatch, as with
    /// [`get_or_create`](Self::get_or_create).
    pub fn get<K, V>(&self, name: &str) -> Option<TypedCache<K, V>>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let caches = self.caches.read();
        caches.get(name).map(|entry| downcast(name, entry))
    }

    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }
}

fn downcast<K, V>(name: &str, entry: &Erased) -> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    if entry.type_id != TypeId::of::<TypedCache<K, V>>() {
        panic!(
            "cache {name:?} already registered with different types: expected {}, got {}",
            std::any::type_name::<TypedCache<K, V>>(),
            entry.type_name
        );
    }
    entry
        .cache
        .downcast_ref::<TypedCache<K, V>>()
        .expect("type id already checked")
        .clone()
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("len", &caches.len())
            .field("names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}
