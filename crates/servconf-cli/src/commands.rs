//! Command execution against a config manager.
//!
//! The manager silently ignores edits it cannot apply. Here those
//! preconditions are checked up front so the user gets a message instead of
//! a command that quietly did nothing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use servconf_core::file_io::{self, ImportError};
use servconf_core::{
    ConfigManager, FeatureFlagValue, FeatureFlags, KeyValueStore, MapboxCustomStyle,
    NotebookCards, ServerConfig,
};

use crate::cli::{CardsAction, Command, FlagAction, FlagsAction, HistoryAction, StylesAction};
use crate::clipboard::copy_to_clipboard;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    InvalidInput {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to format JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("No configuration loaded; run `servconf import <file>` first")]
    NotLoaded,

    #[error("The loaded configuration has no feature flags")]
    NoFeatureFlags,

    #[error("Unknown feature flag: {0}")]
    UnknownFlag(String),

    #[error("History index {index} out of range ({len} entries)")]
    HistoryIndex { index: usize, len: usize },
}

/// Run one command, writing user-facing output to `out`.
pub fn run<S: KeyValueStore>(
    manager: &mut ConfigManager<S>,
    command: Command,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    match command {
        Command::Import { file } => {
            let config = file_io::read_config_file(&file)?;
            manager.load_config(config);
            writeln!(out, "Imported {}", file.display())?;
        }
        Command::Export {
            output,
            indent,
            copy,
            as_list,
        } => export(manager, output.as_deref(), indent, copy, as_list, out)?,
        Command::Show => show(manager, out)?,
        Command::Flag { action } => run_flag(manager, action, out)?,
        Command::Flags {
            action: FlagsAction::Replace { file },
        } => {
            require_loaded(manager)?;
            let flags: FeatureFlags = read_json_file(&file)?;
            let count = flags.len();
            manager.update_feature_flags(flags);
            writeln!(out, "Replaced feature flags ({count} flags)")?;
        }
        Command::Cards { action } => run_cards(manager, action, out)?,
        Command::Styles {
            action: StylesAction::Set { file },
        } => {
            require_loaded(manager)?;
            let styles: Vec<MapboxCustomStyle> = read_json_file(&file)?;
            let count = styles.len();
            manager.update_mapbox_styles(styles);
            writeln!(out, "Replaced map styles ({count} styles)")?;
        }
        Command::History { action } => run_history(manager, action, out)?,
    }

    Ok(())
}

fn export<S: KeyValueStore>(
    manager: &mut ConfigManager<S>,
    output: Option<&Path>,
    indent: usize,
    copy: bool,
    as_list: bool,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let saved = manager.save_config().ok_or(CommandError::NotLoaded)?;
    let text = if as_list {
        file_io::format_json(&[saved], indent)?
    } else {
        file_io::format_json(&saved, indent)?
    };

    if let Some(path) = output {
        file_io::write_export_file(path, &text).map_err(|source| CommandError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        writeln!(out, "Exported to {}", path.display())?;
    } else if !copy {
        writeln!(out, "{text}")?;
    }

    if copy {
        if copy_to_clipboard(&text) {
            writeln!(out, "Copied to clipboard")?;
        } else {
            writeln!(out, "Could not copy to clipboard")?;
        }
    }

    Ok(())
}

fn show<S: KeyValueStore>(
    manager: &ConfigManager<S>,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    match manager.config() {
        Some(config) => {
            writeln!(
                out,
                "Document: {}@{}",
                display_or_dash(&config.username),
                display_or_dash(&config.database)
            )?;
            writeln!(
                out,
                "Jupyter: {}",
                if config.enable_jupyter { "enabled" } else { "disabled" }
            )?;
            writeln!(
                out,
                "Feature flags: {}",
                config.feature_flags.as_ref().map_or(0, |f| f.len())
            )?;
            writeln!(
                out,
                "Map styles: {}",
                config.mapbox_custom_styles.as_ref().map_or(0, |s| s.len())
            )?;
        }
        None => writeln!(out, "Document: none")?,
    }

    let cards = manager.notebook_cards();
    let card_count: usize = cards.iter().map(|(_, list)| list.len()).sum();
    writeln!(
        out,
        "Notebook cards: {} across {} databases",
        card_count,
        cards.len()
    )?;
    writeln!(out, "History: {} entries", manager.history().len())?;

    Ok(())
}

fn run_flag<S: KeyValueStore>(
    manager: &mut ConfigManager<S>,
    action: FlagAction,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    let config = require_loaded(manager)?;
    if config.feature_flags.is_none() {
        return Err(CommandError::NoFeatureFlags);
    }

    match action {
        FlagAction::Set {
            key,
            value,
            description,
        } => {
            manager.update_feature_flag(&key, parse_flag_value(&value), description.as_deref());
            writeln!(out, "Set {key}")?;
        }
        FlagAction::Get { key } => {
            let value = config
                .feature_flag(&key)
                .ok_or_else(|| CommandError::UnknownFlag(key.clone()))?;
            writeln!(out, "{}", serde_json::to_string(value)?)?;
        }
    }

    Ok(())
}

fn run_cards<S: KeyValueStore>(
    manager: &mut ConfigManager<S>,
    action: CardsAction,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    match action {
        CardsAction::Show => {
            let text = file_io::format_json(manager.notebook_cards(), file_io::DEFAULT_INDENT)?;
            writeln!(out, "{text}")?;
        }
        CardsAction::Set { file } => {
            let config = require_loaded(manager)?;
            if config.feature_flags.is_none() {
                return Err(CommandError::NoFeatureFlags);
            }
            let cards: NotebookCards = read_json_file(&file)?;
            let count = cards.len();
            manager.update_notebook_cards(cards);
            writeln!(out, "Replaced notebook cards ({count} databases)")?;
        }
    }

    Ok(())
}

fn run_history<S: KeyValueStore>(
    manager: &mut ConfigManager<S>,
    action: HistoryAction,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    match action {
        HistoryAction::List => {
            if manager.history().is_empty() {
                writeln!(out, "No history")?;
            }
            for (index, entry) in manager.history().iter().enumerate() {
                let when = DateTime::from_timestamp_millis(entry.timestamp)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| entry.timestamp.to_string());
                writeln!(out, "{index:>3}  {when}  {}", entry.description)?;
            }
        }
        HistoryAction::Snapshot { description } => {
            require_loaded(manager)?;
            manager.add_to_history(&description);
            writeln!(out, "Snapshot added")?;
        }
        HistoryAction::Restore { index } => {
            let len = manager.history().len();
            if index >= len {
                return Err(CommandError::HistoryIndex { index, len });
            }
            manager.restore_from_history(index);
            writeln!(out, "Restored snapshot {index}")?;
        }
        HistoryAction::Clear => {
            manager.clear_history();
            writeln!(out, "History cleared")?;
        }
    }

    Ok(())
}

fn require_loaded<S: KeyValueStore>(
    manager: &ConfigManager<S>,
) -> Result<&ServerConfig, CommandError> {
    manager.config().ok_or(CommandError::NotLoaded)
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let content = fs::read_to_string(path).map_err(|source| CommandError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CommandError::InvalidInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Interpret a command-line flag value.
///
/// JSON booleans, numbers and string lists keep their type, a quoted JSON
/// string is unquoted, and anything else is taken as literal text.
pub fn parse_flag_value(raw: &str) -> FeatureFlagValue {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => FeatureFlagValue::Text(s),
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => FeatureFlagValue::from(value),
        Ok(Value::Array(items)) if items.iter().all(Value::is_string) => {
            FeatureFlagValue::from(Value::Array(items))
        }
        _ => FeatureFlagValue::Text(raw.to_string()),
    }
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
