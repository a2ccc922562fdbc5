//! Scheduled reminder model

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Priority, TaskId};

/// Identifier of a local notification.
///
/// Kept within `1..=i32::MAX` so it fits platform notification APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(u32);

impl NotificationId {
    const MAX: u32 = i32::MAX as u32;

    /// Clamp an arbitrary value into the valid range.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        let value = raw & Self::MAX;
        if value == 0 {
            Self(1)
        } else {
            Self(value)
        }
    }

    /// The next id in the valid range, wrapping back to 1.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.0 >= Self::MAX {
            Self(1)
        } else {
            Self(self.0 + 1)
        }
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tagging payload stored with a notification and returned verbatim when listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub task_id: TaskId,
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
}

/// A one-shot notification registered with the local scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReminder {
    pub id: NotificationId,
    pub trigger_at: DateTime<Utc>,
    pub payload: ReminderPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_id_stays_positive() {
        assert_eq!(NotificationId::from_raw(0).value(), 1);
        assert_eq!(NotificationId::from_raw(u32::MAX).value(), i32::MAX as u32);
        assert_eq!(NotificationId::from_raw(0x8000_0005).value(), 5);
    }

    #[test]
    fn notification_id_next_wraps() {
        let max = NotificationId::from_raw(i32::MAX as u32);
        assert_eq!(max.next().value(), 1);
        assert_eq!(NotificationId::from_raw(7).next().value(), 8);
    }
}
