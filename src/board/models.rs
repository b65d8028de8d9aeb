use serde::{Deserialize, Serialize};

/// An account that owns boards. The password digest never leaves the
/// storage layer; this struct is safe to serialize into API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A vertical lane on a board. `position` is 1-based and dense within the
/// owning board: a board with N columns holds positions exactly 1..=N.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub position: i64,
}

/// A card in a column. `position` is 1-based and dense within the owning
/// column, maintained by the repositioner on every move and delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: String,
    pub color: Option<String>,
    pub due_date: Option<String>,
    pub reminder_at: Option<String>,
    pub reminder_sent: bool,
    pub completed: bool,
    pub labels: Vec<String>,
    pub checklists: serde_json::Value,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

// API view types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub board: Board,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}
