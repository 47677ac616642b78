use crate::config::Config;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::importer::import_dir;
use crate::settings::{config_path, db_path, get_data_dir};

pub fn run() -> Result<()> {
    let data_dir = get_data_dir();
    let config = Config::load(&config_path())?;
    let mut conn = get_connection(&db_path())?;
    init_db(&conn)?;

    let summary = import_dir(&mut conn, &config, &data_dir)?;
    log::info!(
        "{} files imported ({} rows), {} unchanged",
        summary.imported_files,
        summary.rows,
        summary.skipped_files
    );
    Ok(())
}
