//! Key/value persistence for manager state.
//!
//! # Overview
//!
//! The manager mirrors its state into a string-only key/value store, the
//! same shape as browser local storage. Two implementations are provided:
//!
//! - [`MemoryStore`] - in-process map, optionally with a size quota
//! - [`FileStore`] - one JSON file per key under a directory
//!
//! # File Locations
//!
//! ```text
//! <data dir>/
//! ├── heavyai-config.json           # Current document
//! └── heavyai-config-history.json   # History array
//! ```
//!
//! # Atomic Writes
//!
//! `FileStore` writes to `<key>.json.tmp` and renames over `<key>.json`, so a
//! crash mid-write never leaves a truncated value behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage quota exceeded writing {key}: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
}

/// Blocking, string-only key/value storage.
///
/// A missing key reads as `Ok(None)`. Both reads and writes may fail; the
/// manager logs those failures and carries on.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory store.
///
/// With a quota, a write fails when the total size of all keys and values
/// would exceed it, like a browser's local storage limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that holds at most `quota` bytes of keys and values.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// Total bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.values.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let replaced = self.values.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// Directory-backed store with one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Keys become file names, so keep them to a portable character set
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let file_path = self.path_for(key)?;

        if !file_path.exists() {
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(&file_path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let file_path = self.path_for(key)?;
        let temp_path = self.dir.join(format!("{key}.json.tmp"));

        fs::create_dir_all(&self.dir)?;
        fs::write(&temp_path, value)?;
        if let Err(e) = fs::rename(&temp_path, &file_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let file_path = self.path_for(key)?;

        if file_path.exists() {
            fs::remove_file(&file_path)?;
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
