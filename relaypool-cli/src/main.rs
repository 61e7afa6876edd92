//! Relaypool operator CLI.
//!
//! Opens the account database in the data directory, builds a dispatcher
//! and runs one command against it.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use relaypool_core::modules::{config as core_config, logger, paths};
use relaypool_core::{AccountStore, Dispatcher, MemoryStore, SqliteStore};

mod account_commands;
mod cli;
mod commands;
mod config_commands;
mod report_commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.data_dir {
        std::env::set_var("RELAYPOOL_DATA_DIR", dir);
    }

    let log_dir = if cli.memory { None } else { paths::get_logs_dir().ok() };
    let _log_guard = logger::init_logger(&cli.log_level, log_dir.as_deref())
        .map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Config(cmd) => commands::handle_config_command(cmd),
        command => {
            let dispatcher = open_dispatcher(cli.memory)?;
            commands::handle_command(&dispatcher, command).await
        },
    }
}

fn open_dispatcher(memory: bool) -> Result<Arc<Dispatcher>> {
    let config = core_config::load_config().map_err(|e| anyhow::anyhow!(e))?;

    let store: Arc<dyn AccountStore> = if memory {
        tracing::warn!("Using in-memory store; changes are discarded on exit");
        Arc::new(MemoryStore::new())
    } else {
        let db_path = paths::get_database_path().map_err(|e| anyhow::anyhow!(e))?;
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        tracing::debug!("Opened account database at {}", db_path.display());
        Arc::new(store)
    };

    Ok(Arc::new(Dispatcher::new(store, config)?))
}
