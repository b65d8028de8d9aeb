//! Typed error hierarchy for the corkboard server.
//!
//! A single enum covers the board subsystem: entity lookups, ownership
//! checks, reposition failures, and storage-layer errors.

use thiserror::Error;

/// Errors from the board subsystem (API, storage, repositioner).
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email '{email}' is already taken")]
    EmailTaken { email: String },

    #[error("Board {id} not found")]
    BoardNotFound { id: i64 },

    #[error("Column {id} not found")]
    ColumnNotFound { id: i64 },

    #[error("Task {id} not found")]
    TaskNotFound { id: i64 },

    #[error("Notification {id} not found")]
    NotificationNotFound { id: i64 },

    #[error("Reposition failed: {0}")]
    RepositionFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
