use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::api::SharedState;
use super::auth;
use super::models::*;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

/// A serialized [`WsMessage`] addressed to one user's sockets. All board
/// data is single-owner, so every event carries exactly one recipient.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub user_id: i64,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    BoardCreated {
        board: Board,
    },
    BoardUpdated {
        board: Board,
    },
    BoardDeleted {
        board_id: i64,
    },
    ColumnCreated {
        column: Column,
    },
    ColumnUpdated {
        column: Column,
    },
    ColumnReordered {
        column: Column,
    },
    ColumnDeleted {
        column_id: i64,
        board_id: i64,
    },
    TaskCreated {
        task: Task,
    },
    TaskUpdated {
        task: Task,
    },
    TaskMoved {
        task_id: i64,
        from_column_id: i64,
        to_column_id: i64,
        position: i64,
    },
    TaskDeleted {
        task_id: i64,
        column_id: i64,
    },
    NotificationAdded {
        notification: Notification,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Upgrade `GET /ws?token=...` to a WebSocket. Connections whose token does
/// not resolve to a live session are rejected before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<SharedState>,
) -> Response {
    let token = query.token.unwrap_or_default();
    let user = state
        .db
        .call(move |db| auth::authenticate(db, &token))
        .await;
    match user {
        Ok(user) => {
            let rx = state.ws_tx.subscribe();
            ws.on_upgrade(move |socket| handle_socket(socket, rx, user.id))
        }
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<Envelope>, user_id: i64) {
    let (sender, receiver) = socket.split();
    run_socket_loop(sender, receiver, rx, user_id).await;
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Combines broadcast forwarding, client message receiving, and periodic
/// ping/pong health checking into a single select loop. Only envelopes
/// addressed to this socket's user are forwarded. If no Pong is received
/// within [`PONG_TIMEOUT`] after a Ping is sent, the connection is
/// considered dead and the loop exits.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<Envelope>,
    user_id: i64,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Broadcast forwarding ────────────────────────────────
            result = rx.recv() => {
                match result {
                    Ok(envelope) => {
                        if envelope.user_id != user_id {
                            continue;
                        }
                        if sender.send(Message::Text(envelope.payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed some messages; continue receiving
                        continue;
                    }
                }
            }

            // ── Client messages (pong, close, etc.) ─────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ignore other messages from client (Text, Binary, Ping)
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

// ── Broadcast helper ─────────────────────────────────────────────────

/// Serialize and broadcast a WsMessage to the given user's connected
/// sockets. Returns silently even if no clients are connected.
pub fn broadcast_to(tx: &broadcast::Sender<Envelope>, user_id: i64, msg: &WsMessage) {
    match serde_json::to_string(msg) {
        Ok(payload) => {
            let _ = tx.send(Envelope { user_id, payload }); // Ignore error if no receivers
        }
        Err(e) => {
            tracing::warn!("Failed to serialize WsMessage: {e}");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
