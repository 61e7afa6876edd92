use std::fs;
use std::path::{Path, PathBuf};

use relaypool_types::DispatchConfig;

use crate::modules::paths::get_data_dir;

const CONFIG_FILE: &str = "config.json";

/// Load the dispatcher configuration from the data directory.
///
/// A missing file yields the defaults. The result is always validated.
pub fn load_config() -> Result<DispatchConfig, String> {
    load_config_from(&get_data_dir()?.join(CONFIG_FILE))
}

pub fn load_config_from(config_path: &Path) -> Result<DispatchConfig, String> {
    if !config_path.exists() {
        return DispatchConfig::default().validate().map_err(|e| e.to_string());
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    let config: DispatchConfig = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

    config.validate().map_err(|e| e.to_string())
}

/// Save the dispatcher configuration to the data directory.
pub fn save_config(config: &DispatchConfig) -> Result<PathBuf, String> {
    let config_path = get_data_dir()?.join(CONFIG_FILE);
    save_config_to(config, &config_path)?;
    Ok(config_path)
}

pub fn save_config_to(config: &DispatchConfig, config_path: &Path) -> Result<(), String> {
    let temp_path = config_path.with_extension("json.tmp");

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| format!("Failed to write temp config: {}", e))?;
    fs::rename(&temp_path, config_path).map_err(|e| format!("Failed to save config: {}", e))
}

/// Update specific fields in the config.
pub fn update_config<F>(updater: F) -> Result<DispatchConfig, String>
where
    F: FnOnce(&mut DispatchConfig),
{
    let mut config = load_config()?;
    updater(&mut config);
    let config = config.validate().map_err(|e| e.to_string())?;
    save_config(&config)?;
    Ok(config)
}
