use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState};
use super::auth::DEFAULT_SESSION_TTL_HOURS;
use super::db::{BoardDb, DbHandle};
use super::reminders::{self, DEFAULT_POLL_INTERVAL_SECS};
use super::ws::{self, Envelope};

/// Configuration for the board server.
pub struct ServerConfig {
    pub port: u16,
    pub db_path: std::path::PathBuf,
    pub dev_mode: bool,
    pub session_ttl_hours: i64,
    pub reminder_poll_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            db_path: std::path::PathBuf::from(".corkboard/corkboard.db"),
            dev_mode: false,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            reminder_poll_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Build the full application router with API and WebSocket routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Start the board server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    // Ensure parent directory exists for DB
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = BoardDb::new(&config.db_path).context("Failed to initialize board database")?;
    let db = DbHandle::new(db);
    let (ws_tx, _rx) = broadcast::channel::<Envelope>(256);

    reminders::spawn_reminder_scheduler(
        db.clone(),
        ws_tx.clone(),
        Duration::from_secs(config.reminder_poll_secs),
    );

    let state = Arc::new(AppState {
        db,
        ws_tx,
        session_ttl_hours: config.session_ttl_hours,
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("corkboard running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutting down...");
}
