//! Import and export of documents as JSON files.
//!
//! # Import
//!
//! Files come in two shapes:
//!
//! - A single document: `{ "username": ..., ... }`
//! - A legacy server list: `[{ ...first server... }, ...]`, where only the
//!   first entry is used
//!
//! # Export
//!
//! Exports are indented JSON (two spaces unless told otherwise), written with
//! the same write-then-rename pattern the stores use.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use thiserror::Error;

use crate::types::ServerConfig;

pub const DEFAULT_INDENT: usize = 2;
pub const DEFAULT_EXPORT_FILENAME: &str = "servers.json";
pub const EXPORT_MEDIA_TYPE: &str = "application/json";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse JSON file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to parse JSON file: server list is empty")]
    EmptyServerList,
}

/// Parse file content into a document.
pub fn parse_config(content: &str) -> Result<ServerConfig, ImportError> {
    let value: Value = serde_json::from_str(content)?;

    let document = match value {
        Value::Array(servers) => servers
            .into_iter()
            .next()
            .ok_or(ImportError::EmptyServerList)?,
        other => other,
    };

    Ok(serde_json::from_value(document)?)
}

/// Read and parse a document file.
pub fn read_config_file(path: &Path) -> Result<ServerConfig, ImportError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Format any serializable value as JSON indented by `spaces` spaces.
pub fn format_json<T: Serialize>(value: &T, spaces: usize) -> Result<String, serde_json::Error> {
    let indent = " ".repeat(spaces);
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Write exported content to `path`, replacing any existing file.
pub fn write_export_file(path: &Path, content: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}
