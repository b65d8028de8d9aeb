//! Background reminder sweep.
//!
//! Once per poll interval, tasks whose `reminder_at` has passed and whose
//! reminder has not fired yet get a notification row (created by the
//! storage layer in one transaction) which is then pushed to the owning
//! user's sockets.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::db::DbHandle;
use super::ws::{Envelope, WsMessage, broadcast_to};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Spawn the reminder scheduler. The first sweep runs immediately, then one
/// per `poll_interval`. The handle is returned so tests can abort the loop.
pub fn spawn_reminder_scheduler(
    db: DbHandle,
    ws_tx: broadcast::Sender<Envelope>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match db.call(|db| db.fire_due_reminders()).await {
                Ok(fired) => {
                    if !fired.is_empty() {
                        tracing::info!(count = fired.len(), "reminder notifications created");
                    }
                    for notification in fired {
                        broadcast_to(
                            &ws_tx,
                            notification.user_id,
                            &WsMessage::NotificationAdded { notification },
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("reminder sweep failed: {e}");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::db::{BoardDb, TaskPatch, sql_datetime};
    use chrono::Utc;

    #[tokio::test]
    async fn scheduler_broadcasts_due_reminders() {
        let handle = DbHandle::new(BoardDb::new_in_memory().unwrap());
        let (tx, mut rx) = broadcast::channel::<Envelope>(8);

        let past = sql_datetime(Utc::now() - chrono::Duration::minutes(1));
        let user_id = handle
            .call(move |db| {
                let user = db.create_user("ada@example.com", "digest", "Ada", "L")?;
                let board = db.create_board(user.id, "Board")?;
                let column = db.board_view(user.id, board.id)?.columns[0].column.clone();
                let task = db.create_task(user.id, column.id, "Ship it", "", None)?;
                db.update_task(
                    user.id,
                    task.id,
                    TaskPatch {
                        reminder_at: Some(past),
                        ..Default::default()
                    },
                )?;
                Ok(user.id)
            })
            .await
            .unwrap();

        let scheduler = spawn_reminder_scheduler(handle, tx, Duration::from_millis(20));

        let envelope = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("scheduler did not broadcast in time")
            .unwrap();
        assert_eq!(envelope.user_id, user_id);
        assert!(envelope.payload.contains("\"type\":\"NotificationAdded\""));
        assert!(envelope.payload.contains("Ship it"));

        scheduler.abort();
    }
}
