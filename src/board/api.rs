use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::auth;
use super::db::{DbHandle, TaskPatch, sql_datetime};
use super::models::User;
use super::ws::{Envelope, WsMessage, broadcast_to};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ws_tx: broadcast::Sender<Envelope>,
    pub session_ttl_hours: i64,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user: User,
    pub token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateBoardRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateColumnRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateColumnRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct ReorderColumnRequest {
    pub new_position: i64,
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub due_date: Option<String>,
    pub reminder_at: Option<String>,
    pub labels: Option<Vec<String>>,
    pub checklists: Option<serde_json::Value>,
    pub completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct ReorderTaskRequest {
    pub new_column_id: Option<i64>,
    pub new_position: i64,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match &err {
            BoardError::NotAuthenticated | BoardError::InvalidCredentials => {
                ApiError::Unauthorized(err.to_string())
            }
            BoardError::NotAuthorized => ApiError::Forbidden(err.to_string()),
            BoardError::EmailTaken { .. } => ApiError::Conflict(err.to_string()),
            BoardError::BoardNotFound { .. }
            | BoardError::ColumnNotFound { .. }
            | BoardError::TaskNotFound { .. }
            | BoardError::NotificationNotFound { .. } => ApiError::NotFound(err.to_string()),
            BoardError::RepositionFailed(_) => ApiError::Unprocessable(err.to_string()),
            BoardError::BadRequest(_) => ApiError::BadRequest(err.to_string()),
            BoardError::Database(_) | BoardError::LockPoisoned | BoardError::Other(_) => {
                tracing::error!("internal error: {err}");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{id}",
            get(get_board).patch(update_board).delete(delete_board),
        )
        .route("/api/boards/{id}/columns", post(create_column))
        .route(
            "/api/columns/{id}",
            patch(update_column).delete(delete_column),
        )
        .route("/api/columns/{id}/reorder", patch(reorder_column))
        .route("/api/columns/{id}/tasks", post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/reorder", patch(reorder_task))
        .route("/api/notifications", get(list_notifications))
        .route(
            "/api/notifications/{id}/read",
            post(mark_notification_read),
        )
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Resolve the request's bearer token to a user, or 401.
async fn current_user(state: &SharedState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
    let user = state.db.call(move |db| auth::authenticate(db, &token)).await?;
    Ok(user)
}

/// Accept RFC 3339 or SQL-style timestamps and normalize to the stored
/// format so SQL comparisons against `datetime('now')` stay correct.
fn normalize_datetime(field: &str, value: &str) -> Result<String, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(sql_datetime(dt.with_timezone(&Utc)));
    }
    if NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok() {
        return Ok(value.to_string());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid {field}: '{value}' (expected RFC 3339 or 'YYYY-MM-DD HH:MM:SS')"
    )))
}

// ── Auth handlers ─────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn signup(
    State(state): State<SharedState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = state.session_ttl_hours;
    let (user, token) = state
        .db
        .call(move |db| {
            auth::signup(
                db,
                &req.email,
                &req.password,
                &req.first_name,
                &req.last_name,
                ttl,
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(SignupResponse { user, token })))
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = state.session_ttl_hours;
    let token = state
        .db
        .call(move |db| auth::login(db, &req.email, &req.password, ttl))
        .await?;
    Ok(Json(LoginResponse { token }))
}

// ── Board handlers ────────────────────────────────────────────────────

async fn list_boards(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let boards = state.db.call(move |db| db.list_boards(user.id)).await?;
    Ok(Json(boards))
}

async fn create_board(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<CreateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let board = state
        .db
        .call(move |db| db.create_board(user.id, &req.name))
        .await?;
    broadcast_to(
        &state.ws_tx,
        board.user_id,
        &WsMessage::BoardCreated {
            board: board.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let view = state.db.call(move |db| db.board_view(user.id, id)).await?;
    Ok(Json(view))
}

async fn update_board(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let board = state
        .db
        .call(move |db| db.update_board(user.id, id, req.name.as_deref()))
        .await?;
    broadcast_to(
        &state.ws_tx,
        board.user_id,
        &WsMessage::BoardUpdated {
            board: board.clone(),
        },
    );
    Ok(Json(board))
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let board = state
        .db
        .call(move |db| db.delete_board(user.id, id))
        .await?;
    broadcast_to(
        &state.ws_tx,
        board.user_id,
        &WsMessage::BoardDeleted { board_id: board.id },
    );
    Ok(StatusCode::NO_CONTENT)
}

// ── Column handlers ───────────────────────────────────────────────────

async fn create_column(
    State(state): State<SharedState>,
    Path(board_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CreateColumnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let column = state
        .db
        .call(move |db| db.create_column(user_id, board_id, &req.name))
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::ColumnCreated {
            column: column.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(column)))
}

async fn update_column(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateColumnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let column = state
        .db
        .call(move |db| db.update_column(user_id, id, req.name.as_deref()))
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::ColumnUpdated {
            column: column.clone(),
        },
    );
    Ok(Json(column))
}

async fn delete_column(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let column = state
        .db
        .call(move |db| db.delete_column(user_id, id))
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::ColumnDeleted {
            column_id: column.id,
            board_id: column.board_id,
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

/// `reorderColumn(columnId, newPosition)` — same-board move only; the
/// repositioner keeps the board's columns dense.
async fn reorder_column(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReorderColumnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let column = state
        .db
        .call(move |db| db.reorder_column(user_id, id, req.new_position))
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::ColumnReordered {
            column: column.clone(),
        },
    );
    Ok(Json(column))
}

// ── Task handlers ─────────────────────────────────────────────────────

async fn create_task(
    State(state): State<SharedState>,
    Path(column_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let task = state
        .db
        .call(move |db| {
            db.create_task(
                user_id,
                column_id,
                &req.title,
                req.description.as_deref().unwrap_or(""),
                req.color.as_deref(),
            )
        })
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::TaskCreated { task: task.clone() },
    );
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let task = state.db.call(move |db| db.get_task(user.id, id)).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;

    let due_date = match &req.due_date {
        Some(value) => Some(normalize_datetime("due_date", value)?),
        None => None,
    };
    let reminder_at = match &req.reminder_at {
        Some(value) => Some(normalize_datetime("reminder_at", value)?),
        None => None,
    };
    let patch = TaskPatch {
        title: req.title,
        description: req.description,
        color: req.color,
        due_date,
        reminder_at,
        labels: req.labels,
        checklists: req.checklists,
        completed: req.completed,
    };

    let task = state
        .db
        .call(move |db| db.update_task(user_id, id, patch))
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::TaskUpdated { task: task.clone() },
    );
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let task = state.db.call(move |db| db.delete_task(user_id, id)).await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::TaskDeleted {
            task_id: task.id,
            column_id: task.column_id,
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

/// `reorderTask(taskId, newColumnId?, newPosition)` — same-column or
/// cross-column move. The destination column must resolve (404 otherwise)
/// and belong to the caller (403) before any position shifts.
async fn reorder_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReorderTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let user_id = user.id;
    let (from_column_id, task) = state
        .db
        .call(move |db| {
            // Capture the source column before the move for the WsMessage.
            let before = db.get_task(user_id, id)?;
            let task = db.reorder_task(user_id, id, req.new_column_id, req.new_position)?;
            Ok((before.column_id, task))
        })
        .await?;
    broadcast_to(
        &state.ws_tx,
        user_id,
        &WsMessage::TaskMoved {
            task_id: task.id,
            from_column_id,
            to_column_id: task.column_id,
            position: task.position,
        },
    );
    Ok(Json(task))
}

// ── Notification handlers ─────────────────────────────────────────────

async fn list_notifications(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let notifications = state
        .db
        .call(move |db| db.list_notifications(user.id))
        .await?;
    Ok(Json(notifications))
}

async fn mark_notification_read(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let notification = state
        .db
        .call(move |db| db.mark_notification_read(user.id, id))
        .await?;
    Ok(Json(notification))
}

async fn mark_all_read(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let updated = state
        .db
        .call(move |db| db.mark_all_notifications_read(user.id))
        .await?;
    Ok(Json(serde_json::json!({"updated": updated})))
}

// ── Tests ─────────────────────────────────────────────────────────────
