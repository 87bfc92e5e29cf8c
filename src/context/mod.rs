//! Group context resolution with caching.
//!
//! Resolves who is an admin in a group (sender and bot) from a cached
//! snapshot of the group's participant list, fetching fresh metadata
//! from the connection under a bounded timeout on a miss.
//!
//! The cache key is `(namespace, chat)`, so the main session and each
//! sub-session keep independent snapshots. Entries are replaced
//! wholesale; a read past the TTL is a miss, never a stale value.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::config::Config;
use crate::connection::{Connection, GroupMetadata, Namespace};
use crate::utils::is_group_jid;

/// Cached snapshot of a group's membership and admin roles.
#[derive(Debug)]
pub struct GroupContext {
    /// Raw metadata as fetched. `None` only in fail-closed contexts,
    /// which are never cached.
    pub metadata: Option<GroupMetadata>,

    /// Normalized JIDs holding an admin role.
    pub admin_jids: HashSet<String>,

    /// Whether this session's own identity holds an admin role.
    pub bot_is_admin: bool,

    /// When the snapshot was captured.
    pub captured_at: Instant,
}

/// Normalized view of one message's privilege context.
#[derive(Debug, Clone, Default)]
pub struct ResolvedContext {
    pub is_group: bool,
    pub is_owner: bool,
    pub sender_is_admin: bool,
    pub bot_is_admin: bool,
    pub group: Option<Arc<GroupContext>>,
}

/// Resolver over the shared group-context cache.
#[derive(Clone)]
pub struct ContextResolver {
    cache: TypedCache<String, Arc<GroupContext>>,
    config: Arc<Config>,
}

impl ContextResolver {
    pub fn new(config: Arc<Config>, caches: &CacheRegistry) -> Self {
        let cache = caches.get_or_create("group_context", CacheConfig::group_context());
        Self { cache, config }
    }

    /// Resolve the privilege context for a message.
    ///
    /// When `need_group_meta` is false (or the chat is not a group) this
    /// returns a minimal context without paying the metadata-fetch cost:
    /// both admin flags default to false, which fails closed for
    /// admin-gated actions.
    pub async fn resolve(
        &self,
        conn: &dyn Connection,
        chat_id: &str,
        sender_jid: &str,
        need_group_meta: bool,
    ) -> ResolvedContext {
        let sender = conn.decode_jid(sender_jid);
        let mut ctx = ResolvedContext {
            is_group: is_group_jid(chat_id),
            is_owner: self.is_owner(conn, &sender),
            ..Default::default()
        };

        if !(ctx.is_group && need_group_meta) {
            return ctx;
        }

        let key = cache_key(&conn.identity().namespace, chat_id);
        if let Some(group) = self.cache.get(&key) {
            debug!(chat = chat_id, "group context cache hit");
            // the admin set is cheap to re-key per sender; the rest of
            // the snapshot is reused verbatim
            ctx.sender_is_admin = group.admin_jids.contains(&sender);
            ctx.bot_is_admin = group.bot_is_admin;
            ctx.group = Some(group);
            return ctx;
        }

        match timeout(self.config.metadata_timeout, conn.group_metadata(chat_id)).await {
            Ok(Ok(metadata)) => {
                let group = Arc::new(build_group_context(conn, metadata));
                self.cache.insert(key, Arc::clone(&group));
                ctx.sender_is_admin = group.admin_jids.contains(&sender);
                ctx.bot_is_admin = group.bot_is_admin;
                ctx.group = Some(group);
            }
            Ok(Err(err)) => {
                // fail closed: no admin data means no admin-gated action
                warn!(chat = chat_id, error = %err, "group metadata fetch failed");
            }
            Err(_) => {
                warn!(chat = chat_id, "group metadata fetch timed out");
            }
        }

        ctx
    }

    /// Whether a decoded sender JID is an owner: either in the configured
    /// owner set, or the designated owner of this sub-session.
    pub fn is_owner(&self, conn: &dyn Connection, sender_decoded: &str) -> bool {
        if sender_decoded.is_empty() {
            return false;
        }
        if self
            .config
            .owner_jids
            .iter()
            .any(|owner| conn.decode_jid(owner) == sender_decoded)
        {
            return true;
        }
        conn.identity()
            .owner_jid
            .as_deref()
            .filter(|owner| !owner.is_empty())
            .is_some_and(|owner| conn.decode_jid(owner) == sender_decoded)
    }

    /// Drop the cached snapshot for a chat, forcing the next resolve to
    /// fetch fresh metadata.
    pub fn invalidate(&self, namespace: &Namespace, chat_id: &str) {
        self.cache.invalidate(&cache_key(namespace, chat_id));
    }
}

fn cache_key(namespace: &Namespace, chat_id: &str) -> String {
    format!("{namespace}:{chat_id}")
}

fn build_group_context(conn: &dyn Connection, metadata: GroupMetadata) -> GroupContext {
    let mut admin_jids = HashSet::new();
    for participant in &metadata.participants {
        let jid = conn.decode_jid(&participant.jid);
        if jid.is_empty() {
            continue;
        }
        if participant.is_admin() {
            admin_jids.insert(jid);
        }
    }

    let bot_is_admin = conn
        .identity()
        .candidate_jids()
        .iter()
        .map(|jid| conn.decode_jid(jid))
        .any(|jid| !jid.is_empty() && admin_jids.contains(&jid));

    GroupContext {
        metadata: Some(metadata),
        admin_jids,
        bot_is_admin,
        captured_at: Instant::now(),
    }
}
