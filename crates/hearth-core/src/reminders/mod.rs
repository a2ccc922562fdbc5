//! Local reminder scheduling.
//!
//! The scheduler owns *policy* only: which tasks get a reminder, when it
//! fires, and keeping the set of scheduled notifications consistent with the
//! synchronized task list. Delivery belongs to a [`NotificationScheduler`]
//! implementation supplied by the platform.

mod ids;
mod trigger;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{NotificationId, ReminderPayload, ReminderTime, ScheduledReminder, Task, TaskId};

pub use ids::{seed_notification_id, InMemoryReminderIds, ReminderIdStore};
pub use trigger::{compute_trigger_time, trigger_time_at};

/// Platform notification primitives.
pub trait NotificationScheduler: Send + Sync {
    /// Register a one-shot notification, replacing any with the same id.
    fn schedule_one_shot(
        &self,
        id: NotificationId,
        trigger_at: DateTime<Utc>,
        payload: &ReminderPayload,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a notification; no-op if it does not exist.
    fn cancel(&self, id: NotificationId) -> impl Future<Output = Result<()>> + Send;

    /// Every pending notification with its tagging payload.
    fn list_scheduled(&self) -> impl Future<Output = Result<Vec<ScheduledReminder>>> + Send;
}

impl<T: NotificationScheduler> NotificationScheduler for Arc<T> {
    fn schedule_one_shot(
        &self,
        id: NotificationId,
        trigger_at: DateTime<Utc>,
        payload: &ReminderPayload,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).schedule_one_shot(id, trigger_at, payload)
    }

    fn cancel(&self, id: NotificationId) -> impl Future<Output = Result<()>> + Send {
        (**self).cancel(id)
    }

    fn list_scheduled(&self) -> impl Future<Output = Result<Vec<ScheduledReminder>>> + Send {
        (**self).list_scheduled()
    }
}

/// Source of "now" for trigger computations.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Outcome of a [`ReminderScheduler::reconcile`] sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tasks whose stale reminders were canceled
    pub canceled: Vec<TaskId>,
    /// Tasks that now have a reminder scheduled
    pub scheduled: Vec<TaskId>,
    /// Pending tasks left without a reminder (past trigger or failure)
    pub skipped: Vec<TaskId>,
}

/// Keeps local notifications consistent with the task list.
pub struct ReminderScheduler<N, S> {
    notifier: N,
    ids: S,
    default_time: ReminderTime,
    clock: Clock,
}

impl<N: NotificationScheduler, S: ReminderIdStore> ReminderScheduler<N, S> {
    pub fn new(notifier: N, ids: S) -> Self {
        Self {
            notifier,
            ids,
            default_time: ReminderTime::DEFAULT,
            clock: Arc::new(Utc::now),
        }
    }

    /// Time of day used when a task has no usable reminder time.
    #[must_use]
    pub const fn with_default_time(mut self, default_time: ReminderTime) -> Self {
        self.default_time = default_time;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Trigger instant for a due date and optional `HH:MM`, if in the future.
    pub fn trigger_time(
        &self,
        due_date: NaiveDate,
        reminder_time: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        let now = (self.clock)().with_timezone(&Local);
        trigger_time_at(due_date, reminder_time, self.default_time, &now)
    }

    /// Schedule (or refresh) the reminder for a pending task.
    ///
    /// Returns `true` when a notification is registered. Completed tasks are
    /// left alone. A task whose trigger time is no longer in the future has
    /// any existing reminder canceled. Failures are logged, not returned.
    pub async fn schedule(&self, task: &Task) -> bool {
        if task.is_completed {
            return false;
        }

        let Some(trigger_at) = self.trigger_time(task.due_date, task.reminder_time.as_deref())
        else {
            tracing::debug!(task_id = %task.id, "Reminder trigger is in the past; not scheduling");
            self.cancel(&task.id).await;
            return false;
        };

        let id = match self.ids.assign(&task.id).await {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(task_id = %task.id, "Failed to assign reminder id: {error}");
                return false;
            }
        };

        if let Err(error) = self.notifier.cancel(id).await {
            tracing::warn!(task_id = %task.id, "Failed to cancel previous reminder: {error}");
        }

        let payload = ReminderPayload {
            task_id: task.id.clone(),
            title: task.title.clone(),
            due_date: task.due_date,
            priority: task.priority,
        };

        match self.notifier.schedule_one_shot(id, trigger_at, &payload).await {
            Ok(()) => {
                tracing::debug!(
                    task_id = %task.id,
                    notification_id = %id,
                    %trigger_at,
                    "Scheduled reminder"
                );
                true
            }
            Err(error) => {
                tracing::warn!(task_id = %task.id, "Failed to schedule reminder: {error}");
                false
            }
        }
    }

    /// Cancel the reminder for a task; no-op if none exists.
    ///
    /// Only a recorded mapping is canceled. The hash seed may belong to a
    /// colliding task, and orphaned entries are swept by `reconcile`.
    pub async fn cancel(&self, task_id: &TaskId) {
        let id = match self.ids.get(task_id).await {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%task_id, "Failed to look up reminder id: {error}");
                return;
            }
        };
        self.cancel_notification(task_id, id).await;
    }

    async fn cancel_notification(&self, task_id: &TaskId, id: NotificationId) {
        if let Err(error) = self.notifier.cancel(id).await {
            tracing::warn!(%task_id, notification_id = %id, "Failed to cancel reminder: {error}");
            return;
        }
        if let Err(error) = self.ids.remove(task_id).await {
            tracing::warn!(%task_id, "Failed to forget reminder id: {error}");
        }
    }

    /// Bring scheduled notifications in line with `tasks`.
    ///
    /// First cancels every reminder whose task vanished or was completed,
    /// then schedules every pending task. Call on task-list changes only.
    pub async fn reconcile(&self, tasks: &[Task]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|task| (&task.id, task)).collect();

        match self.notifier.list_scheduled().await {
            Ok(scheduled) => {
                for reminder in scheduled {
                    let task_id = &reminder.payload.task_id;
                    let stale = by_id.get(task_id).map_or(true, |task| task.is_completed);
                    if stale {
                        self.cancel_notification(task_id, reminder.id).await;
                        report.canceled.push(task_id.clone());
                    }
                }
            }
            Err(error) => {
                tracing::warn!("Failed to list scheduled reminders: {error}");
            }
        }

        for task in tasks.iter().filter(|task| task.is_pending()) {
            if self.schedule(task).await {
                report.scheduled.push(task.id.clone());
            } else {
                report.skipped.push(task.id.clone());
            }
        }

        tracing::debug!(
            canceled = report.canceled.len(),
            scheduled = report.scheduled.len(),
            skipped = report.skipped.len(),
            "Reconciled reminders"
        );
        report
    }
}
