//! Local notification queue for clients without an OS scheduler

use chrono::{DateTime, TimeZone, Utc};
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{NotificationId, ReminderPayload, ScheduledReminder};
use crate::reminders::NotificationScheduler;

/// libSQL-backed `NotificationScheduler`.
///
/// Terminal clients have no OS notification center, so pending reminders
/// live in a table and are delivered by polling [`Self::take_due`].
#[derive(Clone)]
pub struct LibSqlNotificationQueue {
    conn: Connection,
}

impl LibSqlNotificationQueue {
    /// Create a new queue on the given connection
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Remove and return every reminder due at or before `now`.
    ///
    /// One `DELETE .. RETURNING` statement, so a reminder is either returned
    /// or left in place, never dropped in between.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledReminder>> {
        let mut due = self
            .query_reminders(
                "DELETE FROM scheduled_notifications
                 WHERE trigger_at <= ?
                 RETURNING id, trigger_at, payload",
                libsql::params![now.timestamp_millis()],
            )
            .await?;
        due.sort_by_key(|reminder| (reminder.trigger_at, reminder.id));
        Ok(due)
    }

    async fn query_reminders(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<ScheduledReminder>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut reminders = Vec::new();
        while let Some(row) = rows.next().await? {
            reminders.push(parse_reminder(&row)?);
        }
        Ok(reminders)
    }
}

fn parse_reminder(row: &libsql::Row) -> Result<ScheduledReminder> {
    let raw_id = row.get::<i64>(0)?;
    let trigger_ms = row.get::<i64>(1)?;
    let payload = row.get::<String>(2)?;

    let trigger_at = Utc
        .timestamp_millis_opt(trigger_ms)
        .single()
        .ok_or_else(|| Error::Database(format!("invalid trigger timestamp {trigger_ms}")))?;

    Ok(ScheduledReminder {
        id: NotificationId::from_raw(u32::try_from(raw_id).unwrap_or_default()),
        trigger_at,
        payload: serde_json::from_str(&payload)?,
    })
}

impl NotificationScheduler for LibSqlNotificationQueue {
    async fn schedule_one_shot(
        &self,
        id: NotificationId,
        trigger_at: DateTime<Utc>,
        payload: &ReminderPayload,
    ) -> Result<()> {
        let payload_json = serde_json::to_string(payload)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO scheduled_notifications (id, task_id, trigger_at, payload)
                 VALUES (?, ?, ?, ?)",
                libsql::params![
                    i64::from(id.value()),
                    payload.task_id.as_str(),
                    trigger_at.timestamp_millis(),
                    payload_json
                ],
            )
            .await?;
        Ok(())
    }

    async fn cancel(&self, id: NotificationId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM scheduled_notifications WHERE id = ?",
                libsql::params![i64::from(id.value())],
            )
            .await?;
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledReminder>> {
        self.query_reminders(
            "SELECT id, trigger_at, payload FROM scheduled_notifications
             ORDER BY trigger_at ASC, id ASC",
            (),
        )
        .await
    }
}
