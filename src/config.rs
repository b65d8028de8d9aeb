//! Layered configuration for the corkboard server.
//!
//! Settings merge from three layers, later layers winning:
//! file (`corkboard.toml`) → environment (`CORKBOARD_*`) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 3030
//! db_path = ".corkboard/corkboard.db"
//!
//! [auth]
//! session_ttl_hours = 24
//!
//! [reminders]
//! poll_interval_secs = 60
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "corkboard.toml";

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_DB_PATH: &str = ".corkboard/corkboard.db";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub auth: AuthSection,
    pub reminders: RemindersSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub session_ttl_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersSection {
    pub poll_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse corkboard.toml")
    }

    /// Load configuration from `<dir>/corkboard.toml`, or defaults if the
    /// file doesn't exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Effective settings after all layers are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub db_path: PathBuf,
    pub session_ttl_hours: i64,
    pub reminder_poll_secs: u64,
}

impl Settings {
    /// Merge file config, environment variables, and CLI flags; CLI wins.
    pub fn resolve(file: &FileConfig, cli_port: Option<u16>, cli_db_path: Option<PathBuf>) -> Self {
        let port = cli_port
            .or_else(|| env_parse("CORKBOARD_PORT"))
            .or(file.server.port)
            .unwrap_or(DEFAULT_PORT);
        let db_path = cli_db_path
            .or_else(|| std::env::var("CORKBOARD_DB_PATH").ok().map(PathBuf::from))
            .or_else(|| file.server.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let session_ttl_hours = env_parse("CORKBOARD_SESSION_TTL_HOURS")
            .or(file.auth.session_ttl_hours)
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        let reminder_poll_secs = env_parse("CORKBOARD_REMINDER_POLL_SECS")
            .or(file.reminders.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        Self {
            port,
            db_path,
            session_ttl_hours,
            reminder_poll_secs,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}
