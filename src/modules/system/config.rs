use std::fs;
use std::path::Path;

use crate::models::AppConfig;
use crate::modules::auth::credential::get_data_dir;

const CONFIG_FILE: &str = "config.json";

pub fn load_app_config() -> Result<AppConfig, String> {
    let data_dir = get_data_dir()?;
    load_app_config_from(&data_dir)
}

pub fn save_app_config(config: &AppConfig) -> Result<(), String> {
    let data_dir = get_data_dir()?;
    save_app_config_to(&data_dir, config)
}

/// Missing file: defaults are written back so the user has something to edit.
pub fn load_app_config_from(data_dir: &Path) -> Result<AppConfig, String> {
    let config_path = data_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        let config = AppConfig::new();
        if let Err(e) = save_app_config_to(data_dir, &config) {
            tracing::warn!("Failed to write default config: {}", e);
        }
        return Ok(config);
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| format!("failed_to_read_config_file: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("failed_to_parse_config_file: {}", e))
}

pub fn save_app_config_to(data_dir: &Path, config: &AppConfig) -> Result<(), String> {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("failed_to_serialize_config: {}", e))?;

    fs::write(&config_path, content).map_err(|e| format!("failed_to_save_config: {}", e))
}
