use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::db::{get_connection, init_db, sync_config, DB_FILE_NAME};
use crate::error::Result;
use crate::settings::{get_data_dir, load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    settings.data_dir = match data_dir {
        Some(dir) => shellexpand_path(&dir),
        None => get_data_dir().to_string_lossy().to_string(),
    };
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&resolved.join(DB_FILE_NAME))?;
    init_db(&conn)?;

    let config_path = resolved.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        let config = Config::load(&config_path)?;
        sync_config(&conn, &config)?;
        log::info!(
            "registered {} accounts and {} categories",
            config.accounts.len(),
            config.categories.names().len()
        );
    } else {
        println!("No {CONFIG_FILE_NAME} found. Create one in {} before importing.", resolved.display());
    }

    println!("Initialized trackit at {}", resolved.display());
    Ok(())
}
