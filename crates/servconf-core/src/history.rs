//! Edit history.
//!
//! Every significant edit snapshots the whole document. Snapshots are kept
//! newest-first and capped at [`HISTORY_LIMIT`]; pushing past the cap drops
//! the oldest snapshot.
//!
//! # Storage Format
//!
//! History serializes as a plain JSON array, newest entry first:
//!
//! ```json
//! [
//!   { "timestamp": 1717000000123, "config": { ... }, "description": "Updated feature flags" },
//!   { "timestamp": 1716999999000, "config": { ... }, "description": "Initial configuration loaded" }
//! ]
//! ```

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::ServerConfig;

/// Maximum number of snapshots retained.
pub const HISTORY_LIMIT: usize = 50;

/// An immutable snapshot of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// Owned copy of the document at that instant.
    pub config: ServerConfig,

    /// Why the snapshot was taken.
    pub description: String,
}

impl HistoryEntry {
    /// Snapshot `config` now.
    pub fn new(config: ServerConfig, description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            config,
            description: description.into(),
        }
    }
}

/// Newest-first, size-capped list of snapshots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from stored entries (newest first), dropping anything
    /// beyond the cap.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut entries = VecDeque::from(entries);
        entries.truncate(HISTORY_LIMIT);
        Self { entries }
    }

    /// Prepend an entry, evicting the oldest ones past the cap.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    /// Entry at `index`, where 0 is the newest.
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
