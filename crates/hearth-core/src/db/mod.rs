//! Local database layer for Hearth

mod connection;
mod migrations;
mod notification_queue;
mod reminder_ids;

pub use connection::Database;
pub use notification_queue::LibSqlNotificationQueue;
pub use reminder_ids::LibSqlReminderIds;
