use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::CONFIG_FILE_NAME;
use crate::db::DB_FILE_NAME;
use crate::error::{Result, TrackitError};

/// Overrides the data directory recorded in settings.json.
pub const DATA_DIR_ENV: &str = "TRACKIT_DATA";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("trackit")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("trackit")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings).map_err(|e| TrackitError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    resolve_data_dir(std::env::var(DATA_DIR_ENV).ok(), &load_settings())
}

fn resolve_data_dir(env: Option<String>, settings: &Settings) -> PathBuf {
    match env {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(shellexpand_path(dir.trim())),
        _ => PathBuf::from(&settings.data_dir),
    }
}

pub fn config_path() -> PathBuf {
    get_data_dir().join(CONFIG_FILE_NAME)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join(DB_FILE_NAME)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
