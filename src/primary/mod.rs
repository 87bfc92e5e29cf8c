//! Primary-session election.
//!
//! When several sessions share a group chat, one can be pinned as the
//! chat's primary; the router drops group messages arriving on any other
//! session before parsing them. A global pin exists alongside the
//! per-chat table for tooling, but the router gate consults the
//! per-chat table only.
//!
//! State persists as a small JSON file. A missing or corrupt file is the
//! empty state, never an error, and the legacy `subbot:<id>` key
//! spelling is accepted on load.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::connection::Namespace;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryState {
    global_key: Option<Namespace>,
    by_chat: HashMap<String, Namespace>,
}

/// Registry of primary-session pins.
#[derive(Debug)]
pub struct PrimaryRegistry {
    path: Option<PathBuf>,
    state: RwLock<PrimaryState>,
}

impl PrimaryRegistry {
    /// Registry with no backing file; pins live for the process only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(PrimaryState::default()),
        }
    }

    /// Registry backed by a JSON file. A missing or unreadable file
    /// yields the empty state.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = std::fs::read_to_string(&path)
            .ok()
            .map(|raw| parse_state(&raw))
            .unwrap_or_default();
        debug!(path = %path.display(), pins = state.by_chat.len(), "primary registry loaded");
        Self {
            path: Some(path),
            state: RwLock::new(state),
        }
    }

    /// The session pinned as primary for a chat, if any. Does not fall
    /// back to the global pin.
    pub fn primary_for(&self, chat_id: &str) -> Option<Namespace> {
        self.state.read().by_chat.get(chat_id).cloned()
    }

    /// The global pin, if any.
    pub fn global_primary(&self) -> Option<Namespace> {
        self.state.read().global_key.clone()
    }

    pub fn set_global(&self, namespace: Namespace) {
        self.state.write().global_key = Some(namespace);
        self.persist();
    }

    pub fn clear_global(&self) {
        self.state.write().global_key = None;
        self.persist();
    }

    pub fn set_for_chat(&self, chat_id: impl Into<String>, namespace: Namespace) {
        self.state.write().by_chat.insert(chat_id.into(), namespace);
        self.persist();
    }

    pub fn clear_for_chat(&self, chat_id: &str) {
        self.state.write().by_chat.remove(chat_id);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let state = self.state.read();
        match serde_json::to_string_pretty(&*state) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    error!(path = %path.display(), error = %err, "primary registry save failed");
                }
            }
            Err(err) => error!(error = %err, "primary registry serialize failed"),
        }
    }
}

/// Parse the on-disk format, tolerating the legacy shapes: a lone
/// `"key"` field, empty strings for "no pin", and `subbot:<id>` keys.
fn parse_state(raw: &str) -> PrimaryState {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => return PrimaryState::default(),
    };

    let mut state = PrimaryState::default();

    // legacy single-key file: { "key": "main" }
    if value.get("byChat").is_none()
        && let Some(key) = value.get("key").and_then(Value::as_str)
    {
        state.global_key = Namespace::parse(key);
        return state;
    }

    state.global_key = value
        .get("globalKey")
        .or_else(|| value.get("key"))
        .and_then(Value::as_str)
        .and_then(Namespace::parse);

    if let Some(by_chat) = value.get("byChat").and_then(Value::as_object) {
        for (chat_id, key) in by_chat {
            if chat_id.is_empty() {
                continue;
            }
            if let Some(namespace) = key.as_str().and_then(Namespace::parse) {
                state.by_chat.insert(chat_id.clone(), namespace);
            }
        }
    }

    state
}
