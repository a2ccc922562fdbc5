//! Persisted task id to notification id mapping

use libsql::Connection;

use crate::error::Result;
use crate::models::{NotificationId, TaskId};
use crate::reminders::{seed_notification_id, ReminderIdStore};

/// libSQL implementation of `ReminderIdStore`.
///
/// Survives restarts, so a reminder scheduled before a relaunch is still
/// found and canceled afterwards even if its id was probed past a collision.
#[derive(Clone)]
pub struct LibSqlReminderIds {
    conn: Connection,
}

impl LibSqlReminderIds {
    /// Create a new store on the given connection
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn owner_of(&self, id: NotificationId) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT task_id FROM reminder_ids WHERE notification_id = ?",
                libsql::params![i64::from(id.value())],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }
}

impl ReminderIdStore for LibSqlReminderIds {
    async fn get(&self, task_id: &TaskId) -> Result<Option<NotificationId>> {
        let mut rows = self
            .conn
            .query(
                "SELECT notification_id FROM reminder_ids WHERE task_id = ?",
                libsql::params![task_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw = row.get::<i64>(0)?;
                Ok(Some(NotificationId::from_raw(
                    u32::try_from(raw).unwrap_or_default(),
                )))
            }
            None => Ok(None),
        }
    }

    async fn assign(&self, task_id: &TaskId) -> Result<NotificationId> {
        if let Some(existing) = self.get(task_id).await? {
            return Ok(existing);
        }

        let mut candidate = seed_notification_id(task_id);
        while let Some(owner) = self.owner_of(candidate).await? {
            tracing::debug!(
                %task_id,
                %owner,
                notification_id = %candidate,
                "Reminder id collision; probing"
            );
            candidate = candidate.next();
        }

        self.conn
            .execute(
                "INSERT INTO reminder_ids (task_id, notification_id, created_at) VALUES (?, ?, ?)",
                libsql::params![
                    task_id.as_str(),
                    i64::from(candidate.value()),
                    chrono::Utc::now().timestamp_millis()
                ],
            )
            .await?;

        Ok(candidate)
    }

    async fn remove(&self, task_id: &TaskId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM reminder_ids WHERE task_id = ?",
                libsql::params![task_id.as_str()],
            )
            .await?;
        Ok(())
    }
}
