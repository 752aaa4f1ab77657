mod cli;
mod clipboard;
mod commands;

use std::io;
use std::process;
use std::sync::Arc;

use clap::Parser;
use servconf_core::{paths, ConfigManager, EventBus, FileStore};

use crate::cli::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => match paths::default_data_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("error: cannot locate data directory: {e}");
                process::exit(1);
            }
        },
    };
    log::debug!("Using data directory {}", data_dir.display());

    let events = Arc::new(EventBus::new());
    let mut changes = events.subscribe();
    let mut manager = ConfigManager::new(FileStore::new(data_dir)).with_event_bus(events);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = commands::run(&mut manager, cli.command, &mut out);

    while let Ok(event) = changes.try_recv() {
        log::debug!("{}: {}", event.event_type, event.payload);
    }

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
