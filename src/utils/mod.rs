//! Utility functions.
//!
//! JID helpers plus small text helpers used across the crate.

pub mod jid;

pub use jid::{is_group_jid, normalize_jid, strip_device};

/// Collapse whitespace and truncate for log lines.
pub fn shorten(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max).collect();
    format!("{cut}…")
}
