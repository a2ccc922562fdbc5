//! Task id to notification id mapping

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::models::{NotificationId, TaskId};
use crate::util::fnv1a_32;

/// The deterministic starting point for a task's notification id.
#[must_use]
pub fn seed_notification_id(task_id: &TaskId) -> NotificationId {
    NotificationId::from_raw(fnv1a_32(task_id.as_str()))
}

/// Storage for the task id to notification id mapping.
///
/// Ids start at [`seed_notification_id`] and probe forward on collision, so
/// two tasks never share a notification even when their hashes collide.
pub trait ReminderIdStore: Send + Sync {
    /// Look up an existing mapping.
    fn get(&self, task_id: &TaskId) -> impl Future<Output = Result<Option<NotificationId>>> + Send;

    /// Return the existing mapping or allocate and record a new one.
    fn assign(&self, task_id: &TaskId) -> impl Future<Output = Result<NotificationId>> + Send;

    /// Forget the mapping for a task; no-op if absent.
    fn remove(&self, task_id: &TaskId) -> impl Future<Output = Result<()>> + Send;
}

impl<T: ReminderIdStore> ReminderIdStore for Arc<T> {
    fn get(&self, task_id: &TaskId) -> impl Future<Output = Result<Option<NotificationId>>> + Send {
        (**self).get(task_id)
    }

    fn assign(&self, task_id: &TaskId) -> impl Future<Output = Result<NotificationId>> + Send {
        (**self).assign(task_id)
    }

    fn remove(&self, task_id: &TaskId) -> impl Future<Output = Result<()>> + Send {
        (**self).remove(task_id)
    }
}

/// Process-local mapping. Loses its state on restart.
#[derive(Debug, Default)]
pub struct InMemoryReminderIds {
    inner: Mutex<IdTable>,
}

#[derive(Debug, Default)]
struct IdTable {
    by_task: HashMap<TaskId, NotificationId>,
    by_notification: HashMap<NotificationId, TaskId>,
}

impl InMemoryReminderIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, IdTable>> {
        self.inner
            .lock()
            .map_err(|_| Error::Database("reminder id table lock poisoned".to_string()))
    }
}

impl ReminderIdStore for InMemoryReminderIds {
    async fn get(&self, task_id: &TaskId) -> Result<Option<NotificationId>> {
        Ok(self.lock()?.by_task.get(task_id).copied())
    }

    async fn assign(&self, task_id: &TaskId) -> Result<NotificationId> {
        let mut table = self.lock()?;
        if let Some(existing) = table.by_task.get(task_id) {
            return Ok(*existing);
        }

        let mut candidate = seed_notification_id(task_id);
        while table.by_notification.contains_key(&candidate) {
            candidate = candidate.next();
        }
        table.by_task.insert(task_id.clone(), candidate);
        table.by_notification.insert(candidate, task_id.clone());
        Ok(candidate)
    }

    async fn remove(&self, task_id: &TaskId) -> Result<()> {
        let mut table = self.lock()?;
        if let Some(id) = table.by_task.remove(task_id) {
            table.by_notification.remove(&id);
        }
        Ok(())
    }
}
