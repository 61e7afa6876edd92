//! Path utilities for relaypool data storage.

use std::fs;
use std::path::PathBuf;

/// Directory name for data storage.
pub const DATA_DIR: &str = ".relaypool";
/// SQLite database holding accounts and the event log.
pub const DATABASE_FILE: &str = "relaypool.db";
/// Directory for rolling log files.
pub const LOGS_DIR: &str = "logs";

/// Get the data directory path.
///
/// Priority:
/// 1. `RELAYPOOL_DATA_DIR` environment variable (for container deployments)
/// 2. `~/.relaypool`
pub fn get_data_dir() -> Result<PathBuf, String> {
    let data_dir = if let Ok(custom_dir) = std::env::var("RELAYPOOL_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or("Cannot get home directory")?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }

    Ok(data_dir)
}

/// Get the path of the account database.
pub fn get_database_path() -> Result<PathBuf, String> {
    Ok(get_data_dir()?.join(DATABASE_FILE))
}

/// Get the log directory path, creating it if needed.
pub fn get_logs_dir() -> Result<PathBuf, String> {
    let logs_dir = get_data_dir()?.join(LOGS_DIR);

    if !logs_dir.exists() {
        fs::create_dir_all(&logs_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;
    }

    Ok(logs_dir)
}
