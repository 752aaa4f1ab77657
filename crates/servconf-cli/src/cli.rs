//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use servconf_core::file_io::DEFAULT_INDENT;

#[derive(Parser, Debug)]
#[command(
    name = "servconf",
    about = "Edit server configuration documents with undo history",
    version
)]
pub struct Cli {
    /// Directory holding the persisted document and history
    /// (default: $SERVCONF_DATA_DIR or ~/.config/servconf)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a document from a JSON file, replacing the current one
    Import {
        /// A single document, or a server list whose first entry is used
        file: PathBuf,
    },
    /// Export the current document as indented JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Spaces per indentation level
        #[arg(long, default_value_t = DEFAULT_INDENT)]
        indent: usize,
        /// Copy to the system clipboard
        #[arg(long)]
        copy: bool,
        /// Wrap the document in a one-entry server list
        #[arg(long)]
        as_list: bool,
    },
    /// Summarize the current document and history
    Show,
    /// Read or change a single feature flag
    Flag {
        #[command(subcommand)]
        action: FlagAction,
    },
    /// Replace the whole feature flag map
    Flags {
        #[command(subcommand)]
        action: FlagsAction,
    },
    /// Inspect or replace SQL notebook cards
    Cards {
        #[command(subcommand)]
        action: CardsAction,
    },
    /// Replace custom map styles
    Styles {
        #[command(subcommand)]
        action: StylesAction,
    },
    /// Inspect, extend, restore or clear edit history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum FlagAction {
    /// Set a flag. Values parse as JSON booleans, numbers or string lists,
    /// anything else is stored as text
    Set {
        key: String,
        value: String,
        /// History description for this edit
        #[arg(long)]
        description: Option<String>,
    },
    /// Print a flag's value as JSON
    Get { key: String },
}

#[derive(Subcommand, Debug)]
pub enum FlagsAction {
    /// Replace all flags with the JSON object in FILE
    Replace { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum CardsAction {
    /// Print the decoded notebook cards
    Show,
    /// Replace the cards with the JSON object in FILE
    Set { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum StylesAction {
    /// Replace the styles with the JSON array in FILE
    Set { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List snapshots, newest first
    List,
    /// Snapshot the current document
    Snapshot { description: String },
    /// Make snapshot INDEX the current document
    Restore { index: usize },
    /// Delete all snapshots
    Clear,
}
