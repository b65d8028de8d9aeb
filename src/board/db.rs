use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;
use super::reorder::{self, BOARD_COLUMNS, COLUMN_TASKS};
use crate::errors::BoardError;

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads. The mutex also serializes every
/// write, so two concurrent reorders on the same container cannot
/// interleave their range shifts.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, BoardError>
    where
        F: FnOnce(&BoardDb) -> Result<R, BoardError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| BoardError::Other(anyhow::anyhow!("DB task panicked: {e}")))?
    }
}

/// Format a timestamp the way SQLite's `datetime('now')` does, so stored
/// values compare correctly against SQL-side expressions.
pub(crate) fn sql_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Create the schema. Shared by `BoardDb::new` and in-memory test setups.
pub(crate) fn migrate(conn: &Connection) -> Result<(), BoardError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_digest TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS boards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS columns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position > 0)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            column_id INTEGER NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            color TEXT,
            due_date TEXT,
            reminder_at TEXT,
            reminder_sent INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            labels TEXT NOT NULL DEFAULT '[]',
            checklists TEXT NOT NULL DEFAULT '[]',
            position INTEGER NOT NULL CHECK (position > 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token);
        CREATE INDEX IF NOT EXISTS idx_boards_user ON boards(user_id);
        CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_reminder ON tasks(reminder_sent, reminder_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
        ",
    )?;
    Ok(())
}

/// Optional fields accepted by [`BoardDb::update_task`]. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub due_date: Option<String>,
    pub reminder_at: Option<String>,
    pub labels: Option<Vec<String>>,
    pub checklists: Option<serde_json::Value>,
    pub completed: Option<bool>,
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, BoardError> {
        let conn = Connection::open(path)
            .context("Failed to open SQLite database")
            .map_err(BoardError::Other)?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self, BoardError> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory SQLite database")
            .map_err(BoardError::Other)?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    // ── Users & sessions ─────────────────────────────────────────────

    pub fn create_user(
        &self,
        email: &str,
        password_digest: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, BoardError> {
        let result = self.conn.execute(
            "INSERT INTO users (email, password_digest, first_name, last_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![email, password_digest, first_name, last_name],
        );
        match result {
            Ok(_) => {}
            Err(e) if e.to_string().contains("UNIQUE constraint failed: users.email") => {
                return Err(BoardError::EmailTaken {
                    email: email.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or_else(|| BoardError::Other(anyhow::anyhow!("User not found after insert")))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, BoardError> {
        self.conn
            .query_row(
                "SELECT id, email, first_name, last_name, created_at FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()
            .map_err(Into::into)
    }

    /// `(user_id, password_digest)` for a login attempt; `None` when the
    /// email is unknown.
    pub fn credentials_for(&self, email: &str) -> Result<Option<(i64, String)>, BoardError> {
        self.conn
            .query_row(
                "SELECT id, password_digest FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<(), BoardError> {
        self.conn.execute(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?1, ?2, ?3)",
            params![user_id, token, expires_at],
        )?;
        Ok(())
    }

    /// Resolve a bearer token to its user. Expired sessions do not resolve.
    pub fn user_for_token(&self, token: &str) -> Result<Option<User>, BoardError> {
        self.conn
            .query_row(
                "SELECT u.id, u.email, u.first_name, u.last_name, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                params![token],
                map_user,
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Boards ───────────────────────────────────────────────────────

    /// Create a board with the three default columns at positions 1..=3.
    pub fn create_board(&self, user_id: i64, name: &str) -> Result<Board, BoardError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO boards (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )?;
        let board_id = tx.last_insert_rowid();
        for (i, column_name) in ["To Do", "Doing", "Done"].iter().enumerate() {
            tx.execute(
                "INSERT INTO columns (board_id, name, position) VALUES (?1, ?2, ?3)",
                params![board_id, column_name, i as i64 + 1],
            )?;
        }
        tx.commit()?;
        self.get_board(board_id)?
            .ok_or_else(|| BoardError::Other(anyhow::anyhow!("Board not found after insert")))
    }

    pub fn list_boards(&self, user_id: i64) -> Result<Vec<Board>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at, updated_at
             FROM boards WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], map_board)?;
        let mut boards = Vec::new();
        for row in rows {
            boards.push(row?);
        }
        Ok(boards)
    }

    pub fn get_board(&self, id: i64) -> Result<Option<Board>, BoardError> {
        self.conn
            .query_row(
                "SELECT id, user_id, name, created_at, updated_at FROM boards WHERE id = ?1",
                params![id],
                map_board,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Full board: columns ordered by position, each with its tasks ordered
    /// by position.
    pub fn board_view(&self, user_id: i64, board_id: i64) -> Result<BoardView, BoardError> {
        let board = self.owned_board(user_id, board_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT id, board_id, name, position FROM columns
             WHERE board_id = ?1 ORDER BY position",
        )?;
        let column_rows = stmt.query_map(params![board_id], map_column)?;

        let mut columns = Vec::new();
        for row in column_rows {
            let column = row?;
            let tasks = self.list_tasks(column.id)?;
            columns.push(ColumnView { column, tasks });
        }
        Ok(BoardView { board, columns })
    }

    pub fn update_board(
        &self,
        user_id: i64,
        board_id: i64,
        name: Option<&str>,
    ) -> Result<Board, BoardError> {
        let board = self.owned_board(user_id, board_id)?;
        if let Some(name) = name {
            self.conn.execute(
                "UPDATE boards SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![name, board.id],
            )?;
        }
        self.get_board(board_id)?
            .ok_or(BoardError::BoardNotFound { id: board_id })
    }

    pub fn delete_board(&self, user_id: i64, board_id: i64) -> Result<Board, BoardError> {
        let board = self.owned_board(user_id, board_id)?;
        // Columns, tasks and notifications go with it via FK cascades.
        self.conn
            .execute("DELETE FROM boards WHERE id = ?1", params![board_id])?;
        Ok(board)
    }

    fn owned_board(&self, user_id: i64, board_id: i64) -> Result<Board, BoardError> {
        let board = self
            .get_board(board_id)?
            .ok_or(BoardError::BoardNotFound { id: board_id })?;
        if board.user_id != user_id {
            return Err(BoardError::NotAuthorized);
        }
        Ok(board)
    }

    // ── Columns ──────────────────────────────────────────────────────

    pub fn create_column(
        &self,
        user_id: i64,
        board_id: i64,
        name: &str,
    ) -> Result<Column, BoardError> {
        self.owned_board(user_id, board_id)?;
        let position = BOARD_COLUMNS.next_position(&self.conn, board_id)?;
        self.conn.execute(
            "INSERT INTO columns (board_id, name, position) VALUES (?1, ?2, ?3)",
            params![board_id, name, position],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_column(id)?
            .ok_or(BoardError::ColumnNotFound { id })
    }

    pub fn get_column(&self, id: i64) -> Result<Option<Column>, BoardError> {
        self.conn
            .query_row(
                "SELECT id, board_id, name, position FROM columns WHERE id = ?1",
                params![id],
                map_column,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn update_column(
        &self,
        user_id: i64,
        column_id: i64,
        name: Option<&str>,
    ) -> Result<Column, BoardError> {
        let column = self.owned_column(user_id, column_id)?;
        if let Some(name) = name {
            self.conn.execute(
                "UPDATE columns SET name = ?1 WHERE id = ?2",
                params![name, column.id],
            )?;
        }
        self.get_column(column_id)?
            .ok_or(BoardError::ColumnNotFound { id: column_id })
    }

    /// Delete a column (tasks cascade) and renumber the board's remaining
    /// columns so positions stay dense.
    pub fn delete_column(&self, user_id: i64, column_id: i64) -> Result<Column, BoardError> {
        let column = self.owned_column(user_id, column_id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM columns WHERE id = ?1", params![column_id])?;
        BOARD_COLUMNS.close_gap(&tx, column.board_id, column.position)?;
        tx.commit()?;
        Ok(column)
    }

    /// Move a column to a new position within its board (columns never
    /// change boards). Shifts and the moved row commit atomically; any
    /// failure rolls the whole move back.
    pub fn reorder_column(
        &self,
        user_id: i64,
        column_id: i64,
        new_position: i64,
    ) -> Result<Column, BoardError> {
        let column = self.owned_column(user_id, column_id)?;
        let tx = self.conn.unchecked_transaction()?;
        reorder::reposition(
            &tx,
            &BOARD_COLUMNS,
            column.id,
            column.board_id,
            column.board_id,
            column.position,
            new_position,
        )
        .map_err(|e| BoardError::RepositionFailed(e.to_string()))?;
        tx.commit()?;
        self.get_column(column_id)?
            .ok_or(BoardError::ColumnNotFound { id: column_id })
    }

    fn owned_column(&self, user_id: i64, column_id: i64) -> Result<Column, BoardError> {
        let column = self
            .get_column(column_id)?
            .ok_or(BoardError::ColumnNotFound { id: column_id })?;
        self.owned_board(user_id, column.board_id)?;
        Ok(column)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(
        &self,
        user_id: i64,
        column_id: i64,
        title: &str,
        description: &str,
        color: Option<&str>,
    ) -> Result<Task, BoardError> {
        self.owned_column(user_id, column_id)?;
        let position = COLUMN_TASKS.next_position(&self.conn, column_id)?;
        self.conn.execute(
            "INSERT INTO tasks (column_id, title, description, color, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![column_id, title, description, color, position],
        )?;
        let id = self.conn.last_insert_rowid();
        self.fetch_task(id)?.ok_or(BoardError::TaskNotFound { id })
    }

    pub fn list_tasks(&self, column_id: i64) -> Result<Vec<Task>, BoardError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_FIELDS} FROM tasks WHERE column_id = ?1 ORDER BY position"
        ))?;
        let rows = stmt.query_map(params![column_id], map_task_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, user_id: i64, task_id: i64) -> Result<Task, BoardError> {
        let task = self
            .fetch_task(task_id)?
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        self.owned_column(user_id, task.column_id)?;
        Ok(task)
    }

    pub fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        patch: TaskPatch,
    ) -> Result<Task, BoardError> {
        let task = self.get_task(user_id, task_id)?;

        let tx = self.conn.unchecked_transaction()?;
        if let Some(title) = &patch.title {
            tx.execute(
                "UPDATE tasks SET title = ?1 WHERE id = ?2",
                params![title, task.id],
            )?;
        }
        if let Some(description) = &patch.description {
            tx.execute(
                "UPDATE tasks SET description = ?1 WHERE id = ?2",
                params![description, task.id],
            )?;
        }
        if let Some(color) = &patch.color {
            tx.execute(
                "UPDATE tasks SET color = ?1 WHERE id = ?2",
                params![color, task.id],
            )?;
        }
        if let Some(due_date) = &patch.due_date {
            tx.execute(
                "UPDATE tasks SET due_date = ?1 WHERE id = ?2",
                params![due_date, task.id],
            )?;
        }
        if let Some(reminder_at) = &patch.reminder_at {
            // A rescheduled reminder fires again even if the old one already did.
            tx.execute(
                "UPDATE tasks SET reminder_at = ?1, reminder_sent = 0 WHERE id = ?2",
                params![reminder_at, task.id],
            )?;
        }
        if let Some(labels) = &patch.labels {
            let json = serde_json::to_string(labels)
                .context("Failed to serialize labels")
                .map_err(BoardError::Other)?;
            tx.execute(
                "UPDATE tasks SET labels = ?1 WHERE id = ?2",
                params![json, task.id],
            )?;
        }
        if let Some(checklists) = &patch.checklists {
            let json = serde_json::to_string(checklists)
                .context("Failed to serialize checklists")
                .map_err(BoardError::Other)?;
            tx.execute(
                "UPDATE tasks SET checklists = ?1 WHERE id = ?2",
                params![json, task.id],
            )?;
        }
        if let Some(completed) = patch.completed {
            tx.execute(
                "UPDATE tasks SET completed = ?1 WHERE id = ?2",
                params![completed, task.id],
            )?;
        }
        tx.execute(
            "UPDATE tasks SET updated_at = datetime('now') WHERE id = ?1",
            params![task.id],
        )?;
        tx.commit()?;

        self.fetch_task(task_id)?
            .ok_or(BoardError::TaskNotFound { id: task_id })
    }

    /// Delete a task and renumber the column's remaining tasks.
    pub fn delete_task(&self, user_id: i64, task_id: i64) -> Result<Task, BoardError> {
        let task = self.get_task(user_id, task_id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        COLUMN_TASKS.close_gap(&tx, task.column_id, task.position)?;
        tx.commit()?;
        Ok(task)
    }

    /// Move a task within its column or into another column on a board the
    /// caller owns. The destination must resolve before any shifting
    /// happens; all writes commit atomically.
    pub fn reorder_task(
        &self,
        user_id: i64,
        task_id: i64,
        new_column_id: Option<i64>,
        new_position: i64,
    ) -> Result<Task, BoardError> {
        let task = self.get_task(user_id, task_id)?;

        let dest_column_id = new_column_id.unwrap_or(task.column_id);
        if dest_column_id != task.column_id {
            self.owned_column(user_id, dest_column_id)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        reorder::reposition(
            &tx,
            &COLUMN_TASKS,
            task.id,
            task.column_id,
            dest_column_id,
            task.position,
            new_position,
        )
        .map_err(|e| BoardError::RepositionFailed(e.to_string()))?;
        tx.commit()?;

        self.fetch_task(task_id)?
            .ok_or(BoardError::TaskNotFound { id: task_id })
    }

    fn fetch_task(&self, id: i64) -> Result<Option<Task>, BoardError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_FIELDS} FROM tasks WHERE id = ?1"),
                params![id],
                map_task_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(Some(row.into_task()?)),
            None => Ok(None),
        }
    }

    // ── Notifications ────────────────────────────────────────────────

    pub fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>, BoardError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, task_id, message, read, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], map_notification)?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    pub fn mark_notification_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<Notification, BoardError> {
        let updated = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            params![notification_id, user_id],
        )?;
        if updated == 0 {
            return Err(BoardError::NotificationNotFound {
                id: notification_id,
            });
        }
        self.conn
            .query_row(
                "SELECT id, user_id, task_id, message, read, created_at
                 FROM notifications WHERE id = ?1",
                params![notification_id],
                map_notification,
            )
            .map_err(Into::into)
    }

    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize, BoardError> {
        self.conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                params![user_id],
            )
            .map_err(Into::into)
    }

    /// One reminder sweep: find tasks whose reminder is due and unsent,
    /// create a notification for the owning user, and mark the reminder
    /// sent — all in one transaction so a crash cannot double-notify.
    /// Returns the created notifications for broadcasting.
    pub fn fire_due_reminders(&self) -> Result<Vec<Notification>, BoardError> {
        let tx = self.conn.unchecked_transaction()?;

        let due: Vec<(i64, i64, String, Option<String>)> = {
            let mut stmt = tx.prepare(
                "SELECT t.id, b.user_id, t.title, t.due_date
                 FROM tasks t
                 JOIN columns c ON c.id = t.column_id
                 JOIN boards b ON b.id = c.board_id
                 WHERE t.reminder_sent = 0
                   AND t.reminder_at IS NOT NULL
                   AND t.reminder_at <= datetime('now')
                 ORDER BY t.reminder_at",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            let mut due = Vec::new();
            for row in rows {
                due.push(row?);
            }
            due
        };

        let mut created = Vec::new();
        for (task_id, user_id, title, due_date) in due {
            let due_str = due_date
                .as_deref()
                .and_then(|d| NaiveDateTime::parse_from_str(d, "%Y-%m-%d %H:%M:%S").ok())
                .map(|d| d.format("%B %d, %Y").to_string())
                .unwrap_or_else(|| "No due date set".to_string());
            let message = format!("Reminder: Task '{title}' has a reminder. Due date: {due_str}");

            tx.execute(
                "INSERT INTO notifications (user_id, task_id, message) VALUES (?1, ?2, ?3)",
                params![user_id, task_id, message],
            )?;
            let notification_id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE tasks SET reminder_sent = 1 WHERE id = ?1",
                params![task_id],
            )?;
            created.push(tx.query_row(
                "SELECT id, user_id, task_id, message, read, created_at
                 FROM notifications WHERE id = ?1",
                params![notification_id],
                map_notification,
            )?);
        }

        tx.commit()?;
        Ok(created)
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

const TASK_FIELDS: &str = "id, column_id, title, description, color, due_date, reminder_at, \
                           reminder_sent, completed, labels, checklists, position, created_at, \
                           updated_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_board(row: &rusqlite::Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn map_column(row: &rusqlite::Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        board_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
    })
}

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        message: row.get(3)?,
        read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Intermediate row for reading tasks before the labels/checklists JSON
/// columns are parsed into typed values.
struct TaskRow {
    id: i64,
    column_id: i64,
    title: String,
    description: String,
    color: Option<String>,
    due_date: Option<String>,
    reminder_at: Option<String>,
    reminder_sent: bool,
    completed: bool,
    labels: String,
    checklists: String,
    position: i64,
    created_at: String,
    updated_at: String,
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        column_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        due_date: row.get(5)?,
        reminder_at: row.get(6)?,
        reminder_sent: row.get(7)?,
        completed: row.get(8)?,
        labels: row.get(9)?,
        checklists: row.get(10)?,
        position: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl TaskRow {
    fn into_task(self) -> Result<Task, BoardError> {
        let labels: Vec<String> = serde_json::from_str(&self.labels)
            .context("Failed to parse task labels JSON")
            .map_err(BoardError::Other)?;
        let checklists: serde_json::Value = serde_json::from_str(&self.checklists)
            .context("Failed to parse task checklists JSON")
            .map_err(BoardError::Other)?;
        Ok(Task {
            id: self.id,
            column_id: self.column_id,
            title: self.title,
            description: self.description,
            color: self.color,
            due_date: self.due_date,
            reminder_at: self.reminder_at,
            reminder_sent: self.reminder_sent,
            completed: self.completed,
            labels,
            checklists,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
