//! Data models for Hearth

mod conflict;
mod patch;
mod reminder;
mod task;

pub use conflict::{ConflictDescriptor, ResolutionStrategy};
pub use patch::TaskPatch;
pub use reminder::{NotificationId, ReminderPayload, ScheduledReminder};
pub use task::{NewTask, Priority, ReminderTime, Task, TaskId, INITIAL_VERSION};
