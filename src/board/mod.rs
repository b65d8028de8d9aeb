//! Kanban board back-end.
//!
//! ## Overview
//!
//! Authenticated users own boards; boards hold ordered columns; columns
//! hold ordered tasks. Columns and tasks are dragged around in a client and
//! the server keeps every sibling set's `position` values dense (1..=N)
//! through the repositioner in `reorder.rs` — the one piece of real
//! algorithmic weight here. Task reminders fire from a background sweep and
//! reach the owning user as notifications over a WebSocket.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (Next.js)│ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│         │                                        │
//!                       │         │ BoardDb::reorder_column / reorder_task │
//!                       │         v                                        │
//!                       │  db.rs  (DbHandle, BoardDb, migrations)          │
//!                       │         │                                        │
//!                       │         │ reposition() in one transaction        │
//!                       │         v                                        │
//!                       │  reorder.rs  (SiblingSet, range shifts)          │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                          |
//! |-------------|---------------------------------------------------------|
//! | `models`    | Shared types: `Board`, `Column`, `Task`, view types     |
//! | `auth`      | Password digests, bearer sessions, token resolution     |
//! | `ws`        | `WsMessage` enum + user-addressed `broadcast_to()`      |
//! | `reminders` | Background sweep turning due reminders into pushes      |
//!
//! ## Typical Request Flow (drag a task to another column)
//!
//! 1. `PATCH /api/tasks/:id/reorder` → `api::reorder_task()`
//! 2. The bearer token resolves to a user; the task and the destination
//!    column must both live on boards that user owns.
//! 3. `BoardDb::reorder_task()` opens one transaction: the source column
//!    closes the gap the task leaves, the destination column opens a slot,
//!    the task row gets its new column and position, and the transaction
//!    commits — or everything rolls back.
//! 4. A `TaskMoved` event goes out over the WebSocket to the owner's
//!    connected clients.

pub mod api;
pub mod auth;
pub mod db;
pub mod models;
pub mod reminders;
mod reorder;
pub mod server;
pub mod ws;
