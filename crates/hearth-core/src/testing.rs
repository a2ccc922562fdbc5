//! Synchronous recording fakes for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use crate::api::{ApiError, ApiErrorCode, ApiResult, TaskApi, UpdateOutcome};
use crate::error::{Error, Result, SubscriptionError};
use crate::models::{
    ConflictDescriptor, NewTask, NotificationId, Priority, ReminderPayload, ScheduledReminder,
    Task, TaskId, TaskPatch, INITIAL_VERSION,
};
use crate::reminders::{Clock, NotificationScheduler};
use crate::subscription::{
    EventSink, ListenHandle, OwnershipQuery, SnapshotTransport, TransportEvent,
};

pub fn timestamp(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn fixed_clock(rfc3339: &str) -> Clock {
    let now = timestamp(rfc3339);
    Arc::new(move || now)
}

/// A task owned by `alice`, version 1.
pub fn sample_task(id: &str, is_completed: bool, due_date: &str) -> Task {
    let created = timestamp("2025-01-01T08:00:00Z");
    Task {
        id: TaskId::new(id),
        title: format!("Task {id}"),
        description: None,
        assigned_to: "alice".to_string(),
        created_by: "alice".to_string(),
        due_date: NaiveDate::parse_from_str(due_date, "%Y-%m-%d").unwrap(),
        priority: Priority::Medium,
        is_completed,
        categories: Vec::new(),
        version: INITIAL_VERSION,
        last_modified_by: Some("alice".to_string()),
        reminder_time: None,
        created_at: created,
        updated_at: created,
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TransportState {
    sinks: BTreeMap<usize, EventSink>,
    opened: Vec<String>,
    next_listen_error: Option<SubscriptionError>,
}

/// Push transport fake. Events are delivered synchronously to open queries.
#[derive(Clone)]
pub struct FakeTransport {
    state: Arc<Mutex<TransportState>>,
    auth_synced: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            auth_synced: Arc::new(AtomicBool::new(true)),
            closed: Arc::default(),
            next_id: Arc::default(),
        }
    }

    pub fn set_auth_synced(&self, synced: bool) {
        self.auth_synced.store(synced, Ordering::SeqCst);
    }

    pub fn fail_next_listen(&self, error: SubscriptionError) {
        self.state.lock().unwrap().next_listen_error = Some(error);
    }

    pub fn opened_queries(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().sinks.len()
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: &TransportEvent) {
        let sinks: Vec<EventSink> = self.state.lock().unwrap().sinks.values().cloned().collect();
        for sink in sinks {
            sink(event.clone());
        }
    }

    pub fn push(&self, tasks: Vec<Task>) {
        self.emit(&TransportEvent::Snapshot(tasks));
    }

    pub fn fail(&self, error: SubscriptionError) {
        self.emit(&TransportEvent::Failed(error));
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct FakeListenHandle {
    id: usize,
    state: Arc<Mutex<TransportState>>,
    closed: Arc<AtomicUsize>,
    done: bool,
}

impl ListenHandle for FakeListenHandle {
    fn close(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.state.lock().unwrap().sinks.remove(&self.id);
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl SnapshotTransport for FakeTransport {
    fn auth_synced(&self) -> bool {
        self.auth_synced.load(Ordering::SeqCst)
    }

    fn listen(
        &self,
        query: OwnershipQuery,
        sink: EventSink,
    ) -> std::result::Result<Box<dyn ListenHandle>, SubscriptionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.next_listen_error.take() {
            return Err(error);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.opened.push(query.owner_id().to_string());
        state.sinks.insert(id, sink);
        Ok(Box::new(FakeListenHandle {
            id,
            state: Arc::clone(&self.state),
            closed: Arc::clone(&self.closed),
            done: false,
        }))
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// OS notification scheduler fake.
#[derive(Default)]
pub struct RecordingNotifier {
    scheduled: Mutex<BTreeMap<NotificationId, ScheduledReminder>>,
    denied: AtomicBool,
    schedule_calls: AtomicUsize,
}

impl RecordingNotifier {
    /// Make every subsequent `schedule_one_shot` fail.
    pub fn deny_permission(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }
}

impl NotificationScheduler for RecordingNotifier {
    async fn schedule_one_shot(
        &self,
        id: NotificationId,
        trigger_at: DateTime<Utc>,
        payload: &ReminderPayload,
    ) -> Result<()> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput(
                "notification permission denied".to_string(),
            ));
        }
        self.scheduled.lock().unwrap().insert(
            id,
            ScheduledReminder {
                id,
                trigger_at,
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    async fn cancel(&self, id: NotificationId) -> Result<()> {
        self.scheduled.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledReminder>> {
        Ok(self.scheduled.lock().unwrap().values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// In-memory backend enforcing optimistic concurrency.
#[derive(Default)]
pub struct FakeTaskApi {
    tasks: Mutex<HashMap<TaskId, Task>>,
    offline: AtomicBool,
    updates: Mutex<Vec<(TaskId, TaskPatch)>>,
    actor: Mutex<String>,
}

impl FakeTaskApi {
    pub fn new(actor: &str) -> Self {
        let api = Self::default();
        api.act_as(actor);
        api
    }

    /// Identity recorded as `lastModifiedBy` on subsequent writes.
    pub fn act_as(&self, actor: &str) {
        *self.actor.lock().unwrap() = actor.to_string();
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.lock().unwrap().get(id).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<(TaskId, TaskPatch)> {
        self.updates.lock().unwrap().clone()
    }

    fn check_online(&self) -> ApiResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ApiError::new(ApiErrorCode::Network, "backend unreachable"))
        } else {
            Ok(())
        }
    }
}

impl TaskApi for FakeTaskApi {
    async fn create_task(&self, draft: &NewTask) -> ApiResult<Task> {
        let draft = draft.clone().validated()?;
        self.check_online()?;
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(uuid::Uuid::now_v7().to_string()),
            title: draft.title,
            description: draft.description,
            assigned_to: draft.assigned_to,
            created_by: draft.created_by.clone(),
            due_date: draft.due_date,
            priority: draft.priority,
            is_completed: false,
            categories: draft.categories,
            version: INITIAL_VERSION,
            last_modified_by: Some(draft.created_by),
            reminder_time: draft.reminder_time,
            created_at: now,
            updated_at: now,
        };
        self.insert(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> ApiResult<UpdateOutcome> {
        self.check_online()?;
        self.updates
            .lock()
            .unwrap()
            .push((id.clone(), patch.clone()));

        let actor = self.actor.lock().unwrap().clone();
        let mut tasks = self.tasks.lock().unwrap();
        let current = tasks
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::new(ApiErrorCode::NotFound, format!("no task {id}")))?;

        if let Some(expected) = patch.version {
            if expected != current.version {
                return Ok(UpdateOutcome::Conflict(Box::new(ConflictDescriptor {
                    current_version: current.version,
                    expected_version: expected,
                    last_modified_by: current.last_modified_by.clone(),
                    last_modified_by_name: None,
                    server_task: current,
                    local_task: None,
                    local_changes: patch.clone(),
                })));
            }
        }

        let mut updated = patch.apply_to(&current);
        updated.version = current.version + 1;
        updated.last_modified_by = Some(actor);
        updated.updated_at = Utc::now();
        tasks.insert(id.clone(), updated.clone());
        Ok(UpdateOutcome::Updated(updated))
    }

    async fn delete_task(&self, id: &TaskId) -> ApiResult<()> {
        self.check_online()?;
        self.tasks
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::new(ApiErrorCode::NotFound, format!("no task {id}")))
    }

    async fn list_tasks(&self, owner_id: &str) -> ApiResult<Vec<Task>> {
        self.check_online()?;
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|task| task.is_owned_by(owner_id))
            .cloned()
            .collect())
    }
}
