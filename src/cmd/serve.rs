//! Board server command — `corkboard serve`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use corkboard::board::db::BoardDb;
use corkboard::board::server::{ServerConfig, start_server};
use corkboard::config::{FileConfig, Settings};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
    init: bool,
) -> Result<()> {
    let file = match config_path {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::load_or_default(Path::new("."))?,
    };
    let settings = Settings::resolve(&file, port, db_path);

    if init {
        // Just initialize the database
        if let Some(parent) = settings.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        BoardDb::new(&settings.db_path)?;
        println!("Board database initialized at {}", settings.db_path.display());
        return Ok(());
    }

    start_server(ServerConfig {
        port: settings.port,
        db_path: settings.db_path,
        dev_mode: dev,
        session_ttl_hours: settings.session_ttl_hours,
        reminder_poll_secs: settings.reminder_poll_secs,
    })
    .await
}
