//! ConfigManager - owns the live document, its history and their persistence.
//!
//! # Lifecycle
//!
//! A front end creates one manager per session and keeps it for the whole
//! session. Construction hydrates from the store; from then on every
//! mutation follows the same steps:
//!
//! 1. Apply the change in memory
//! 2. Write the changed value through to the store
//! 3. Snapshot the document into history (where the operation calls for it)
//! 4. Emit change events, if an event bus is attached
//!
//! Store failures are logged and dropped. In-memory state is always the
//! source of truth.
//!
//! # Missing Document
//!
//! Operations that edit the document do nothing when no document is
//! loaded. Front ends are expected to gate editing on
//! [`ConfigManager::is_config_loaded`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::event_bus::{
    EventBus, CONFIG_CHANGED, HISTORY_CHANGED, NOTEBOOK_CARDS_CHANGED, TAB_CHANGED,
};
use crate::history::{History, HistoryEntry};
use crate::notebook_cards::{self, NOTEBOOK_CARDS_KEY};
use crate::storage::KeyValueStore;
use crate::types::{
    FeatureFlagValue, FeatureFlags, MapboxCustomStyle, NotebookCards, ServerConfig,
};

/// Store key holding the serialized live document.
pub const STORAGE_KEY: &str = "heavyai-config";

/// Store key holding the serialized history array.
pub const HISTORY_KEY: &str = "heavyai-config-history";

pub const DEFAULT_TAB: &str = "general";

pub const AUTO_SAVE_DESCRIPTION: &str = "Auto-saved before loading new config";
pub const INITIAL_LOAD_DESCRIPTION: &str = "Initial configuration loaded";
pub const FEATURE_FLAGS_DESCRIPTION: &str = "Updated feature flags";
pub const NOTEBOOK_CARDS_DESCRIPTION: &str = "Updated SQL notebook cards";
pub const MAPBOX_STYLES_DESCRIPTION: &str = "Updated Mapbox styles";
pub const RESTORE_DESCRIPTION: &str = "Restored from history";

/// Configuration state for one editing session.
pub struct ConfigManager<S: KeyValueStore> {
    store: S,
    events: Option<Arc<EventBus>>,
    config: Option<ServerConfig>,
    notebook_cards: NotebookCards,
    is_loaded: bool,
    is_modified: bool,
    active_tab: String,
    history: History,
}

impl<S: KeyValueStore> ConfigManager<S> {
    /// Create a manager and hydrate it from `store`.
    pub fn new(store: S) -> Self {
        let mut manager = Self {
            store,
            events: None,
            config: None,
            notebook_cards: NotebookCards::new(),
            is_loaded: false,
            is_modified: false,
            active_tab: DEFAULT_TAB.to_string(),
            history: History::new(),
        };
        manager.hydrate();
        manager
    }

    /// Attach an event bus that receives every subsequent state change.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn config(&self) -> Option<&ServerConfig> {
        self.config.as_ref()
    }

    pub fn notebook_cards(&self) -> &NotebookCards {
        &self.notebook_cards
    }

    /// True once any document has been loaded this session, including by
    /// hydration.
    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// True while a live document exists.
    pub fn is_config_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// True if the document changed since the last [`save_config`](Self::save_config).
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn active_tab(&self) -> &str {
        &self.active_tab
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Replace the live document with a freshly imported one.
    ///
    /// A document that was already loaded is snapshotted first. The notebook
    /// cards cache is rebuilt from the new document; a malformed cards flag
    /// is logged and leaves the cache empty. The first document of a session
    /// with no history gets an initial snapshot.
    pub fn load_config(&mut self, new_config: ServerConfig) {
        if self.config.is_some() {
            self.add_to_history(AUTO_SAVE_DESCRIPTION);
        }

        self.config = Some(new_config);
        self.is_loaded = true;
        self.sync_notebook_cards();
        self.config_changed();

        if self.history.is_empty() {
            self.add_to_history(INITIAL_LOAD_DESCRIPTION);
        }
    }

    /// Replace the live document without touching history or the notebook
    /// cards cache. Callers doing bulk replacement manage history themselves.
    pub fn update_config(&mut self, new_config: ServerConfig) {
        self.config = Some(new_config);
        self.is_modified = true;
        self.config_changed();
    }

    /// Replace the whole feature flag map.
    ///
    /// Requires a loaded document.
    pub fn update_feature_flags(&mut self, flags: FeatureFlags) {
        let Some(config) = self.config.as_mut() else {
            return;
        };

        config.feature_flags = Some(flags);
        self.sync_notebook_cards();
        self.config_changed();
        self.add_to_history(FEATURE_FLAGS_DESCRIPTION);
        self.is_modified = true;
    }

    /// Set one feature flag, creating it if absent.
    ///
    /// The snapshot is described by `description`, or names the key when
    /// none (or an empty one) is given. Requires a loaded document that
    /// already has a feature flag map.
    pub fn update_feature_flag(
        &mut self,
        key: &str,
        value: impl Into<FeatureFlagValue>,
        description: Option<&str>,
    ) {
        let Some(flags) = self
            .config
            .as_mut()
            .and_then(|config| config.feature_flags.as_mut())
        else {
            return;
        };

        flags.insert(key, value.into());
        if key == NOTEBOOK_CARDS_KEY {
            self.sync_notebook_cards();
        }
        self.config_changed();

        let description = match description.filter(|d| !d.is_empty()) {
            Some(d) => d.to_string(),
            None => format!("Updated feature flag: {key}"),
        };
        self.add_to_history(&description);
        self.is_modified = true;
    }

    /// Replace the notebook cards and encode them into the reserved flag.
    ///
    /// The cache is always updated. The document is only touched when it is
    /// loaded and has a feature flag map.
    pub fn update_notebook_cards(&mut self, cards: NotebookCards) {
        self.notebook_cards = cards;
        self.emit(NOTEBOOK_CARDS_CHANGED, &self.notebook_cards);

        let Some(flags) = self
            .config
            .as_mut()
            .and_then(|config| config.feature_flags.as_mut())
        else {
            return;
        };

        let encoded = match notebook_cards::encode(&self.notebook_cards) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::error!("Failed to encode notebook cards: {}", e);
                return;
            }
        };
        flags.insert(NOTEBOOK_CARDS_KEY, FeatureFlagValue::Text(encoded));

        self.config_changed();
        self.add_to_history(NOTEBOOK_CARDS_DESCRIPTION);
        self.is_modified = true;
    }

    /// Replace the custom map style list.
    ///
    /// Requires a loaded document.
    pub fn update_mapbox_styles(&mut self, styles: Vec<MapboxCustomStyle>) {
        let Some(config) = self.config.as_mut() else {
            return;
        };

        config.mapbox_custom_styles = Some(styles);
        self.config_changed();
        self.add_to_history(MAPBOX_STYLES_DESCRIPTION);
        self.is_modified = true;
    }

    pub fn set_active_tab(&mut self, tab: impl Into<String>) {
        self.active_tab = tab.into();
        self.emit(TAB_CHANGED, &self.active_tab);
    }

    /// Produce an export copy of the document.
    ///
    /// A non-empty notebook cards cache is encoded into the reserved flag of
    /// the copy, replacing whatever was there. Clears the modified flag.
    /// Returns `None`, with no side effects, when no document is loaded.
    pub fn save_config(&mut self) -> Option<ServerConfig> {
        let mut saved = self.config.clone()?;

        if !self.notebook_cards.is_empty() {
            match notebook_cards::encode(&self.notebook_cards) {
                Ok(encoded) => {
                    saved
                        .feature_flags
                        .get_or_insert_with(FeatureFlags::new)
                        .insert(NOTEBOOK_CARDS_KEY, FeatureFlagValue::Text(encoded));
                }
                Err(e) => log::error!("Failed to encode notebook cards for export: {}", e),
            }
        }

        self.is_modified = false;
        Some(saved)
    }

    // ========================================================================
    // History Operations
    // ========================================================================

    /// Snapshot the live document.
    ///
    /// Requires a loaded document. The newest snapshot is index 0; past
    /// [`HISTORY_LIMIT`](crate::history::HISTORY_LIMIT) entries the oldest is
    /// dropped.
    pub fn add_to_history(&mut self, description: &str) {
        let Some(config) = &self.config else {
            return;
        };

        self.history
            .push(HistoryEntry::new(config.clone(), description));
        self.history_changed();
    }

    /// Make a copy of snapshot `index` the live document.
    ///
    /// The restore is itself snapshotted, so every existing entry moves down
    /// one index. Out-of-range indexes are ignored.
    pub fn restore_from_history(&mut self, index: usize) {
        let Some(entry) = self.history.get(index) else {
            return;
        };

        self.config = Some(entry.config.clone());
        self.sync_notebook_cards();
        self.config_changed();
        self.add_to_history(RESTORE_DESCRIPTION);
    }

    /// Drop every snapshot. The live document is untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.history_changed();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn hydrate(&mut self) {
        if let Some(config) = read_stored::<ServerConfig>(&self.store, STORAGE_KEY) {
            self.notebook_cards = cards_from_config(&config);
            self.config = Some(config);
            self.is_loaded = true;
        }

        if let Some(entries) = read_stored::<Vec<HistoryEntry>>(&self.store, HISTORY_KEY) {
            self.history = History::from_entries(entries);
        }

        log::debug!(
            "Hydrated config manager (document: {}, history entries: {})",
            self.config.is_some(),
            self.history.len()
        );
    }

    /// Rebuild the notebook cards cache from the live document.
    fn sync_notebook_cards(&mut self) {
        let cards = self
            .config
            .as_ref()
            .map(cards_from_config)
            .unwrap_or_default();

        if cards != self.notebook_cards {
            self.notebook_cards = cards;
            self.emit(NOTEBOOK_CARDS_CHANGED, &self.notebook_cards);
        }
    }

    fn config_changed(&mut self) {
        if let Some(config) = &self.config {
            write_stored(&mut self.store, STORAGE_KEY, config);
        }
        self.emit(CONFIG_CHANGED, &self.config);
    }

    fn history_changed(&mut self) {
        write_stored(&mut self.store, HISTORY_KEY, &self.history);
        self.emit(HISTORY_CHANGED, &json!({ "len": self.history.len() }));
    }

    fn emit<T: Serialize>(&self, event_type: &str, payload: &T) {
        if let Some(events) = &self.events {
            events.emit(event_type, payload);
        }
    }
}

/// Read and parse one stored value. Missing, unreadable and malformed values
/// all come back as `None`; the latter two are logged.
fn read_stored<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::error!("Failed to read {} from storage: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Ignoring malformed {} in storage: {}", key, e);
            None
        }
    }
}

/// Serialize and store one value, logging any failure.
fn write_stored<T: Serialize>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to serialize {} for storage: {}", key, e);
            return;
        }
    };

    if let Err(e) = store.set(key, &json) {
        log::error!("Failed to write {} to storage: {}", key, e);
    }
}

/// Decode the reserved notebook cards flag of `config`.
fn cards_from_config(config: &ServerConfig) -> NotebookCards {
    match config.feature_flag(NOTEBOOK_CARDS_KEY) {
        None => NotebookCards::new(),
        Some(FeatureFlagValue::Text(raw)) if raw.is_empty() => NotebookCards::new(),
        Some(FeatureFlagValue::Text(raw)) => notebook_cards::decode(raw).unwrap_or_else(|e| {
            log::error!("Failed to parse notebook cards JSON: {}", e);
            NotebookCards::new()
        }),
        Some(other) => {
            log::error!("Notebook cards flag is not a string: {:?}", other);
            NotebookCards::new()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
