//! # servconf-core
//!
//! Core state management for servconf, the server configuration editor.
//!
//! This crate is framework-agnostic and can be driven by any front end
//! (the bundled CLI, a desktop shell, a browser build).
//!
//! ## Key Concepts
//!
//! - **Document**: a [`ServerConfig`] with credentials, feature flags and styles
//! - **History**: newest-first snapshots of the document, capped at 50
//! - **Write-through**: every change is mirrored into a [`KeyValueStore`]
//!   in the same step that made it
//! - **Notebook cards**: per-database cards, stored double-encoded in a
//!   reserved feature flag

pub mod event_bus;
pub mod file_io;
pub mod history;
pub mod manager;
pub mod notebook_cards;
pub mod ordered_map;
pub mod paths;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use event_bus::EventBus;
pub use history::{History, HistoryEntry, HISTORY_LIMIT};
pub use manager::ConfigManager;
pub use notebook_cards::NOTEBOOK_CARDS_KEY;
pub use ordered_map::OrderedMap;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use types::{
    CustomStyles, FeatureFlagValue, FeatureFlags, MapboxCustomStyle, MapboxStyleValue,
    NotebookCard, NotebookCards, ServerConfig,
};
