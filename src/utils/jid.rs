//! JID (chat-protocol address) helpers.
//!
//! A JID looks like `5215512345678@s.whatsapp.net` for users and
//! `1203630XXXX@g.us` for group chats. Multi-device sessions append a
//! device suffix to the user part (`5215512345678:12@s.whatsapp.net`)
//! which must be stripped before comparing identities.

/// A chat id ending in the group suffix marks a group chat.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with("@g.us")
}

/// Remove the `:device` suffix from the user part of a JID.
pub fn strip_device(jid: &str) -> String {
    match jid.split_once('@') {
        Some((user, server)) => {
            let user = user.split(':').next().unwrap_or(user);
            format!("{user}@{server}")
        }
        None => jid.to_string(),
    }
}

/// Generic JID normalizer.
///
/// Used as the fallback when a connection does not provide its own
/// `decode_jid`. Trims and strips the device suffix; anything without an
/// `@server` part is returned as-is.
pub fn normalize_jid(jid: &str) -> String {
    let trimmed = jid.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    strip_device(trimmed)
}
