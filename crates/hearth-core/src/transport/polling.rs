//! Live transport emulated by polling `GET /v1/tasks`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::{ApiError, ApiErrorCode, HttpTaskApi, TaskApi};
use crate::error::SubscriptionError;
use crate::models::Task;
use crate::subscription::{
    normalize_batch, EventSink, ListenHandle, OwnershipQuery, SnapshotTransport, TransportEvent,
};

/// Decides which poll results become events.
///
/// A snapshot is emitted on the first fetch, whenever the set changes, and
/// on the first success after a failure. Only the first failure of a streak
/// is emitted.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    last: Option<Vec<Task>>,
    failing: bool,
}

impl SnapshotTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, tasks: Vec<Task>) -> Option<Vec<Task>> {
        let recovered = std::mem::take(&mut self.failing);
        let normalized = normalize_batch(tasks);
        if !recovered && self.last.as_ref() == Some(&normalized) {
            return None;
        }
        self.last = Some(normalized.clone());
        Some(normalized)
    }

    pub fn fail(&mut self, error: &ApiError) -> Option<SubscriptionError> {
        if std::mem::replace(&mut self.failing, true) {
            return None;
        }
        Some(match error.code {
            ApiErrorCode::Unauthorized => SubscriptionError::AuthNotSynced,
            _ => SubscriptionError::Transport(error.to_string()),
        })
    }
}

/// Polls the task list for an owner on a fixed interval.
pub struct PollingTransport<A = HttpTaskApi> {
    api: Arc<A>,
    interval: Duration,
    auth_synced: bool,
}

impl PollingTransport<HttpTaskApi> {
    /// Auth counts as synced when the client carries an access token.
    #[must_use]
    pub fn from_http(api: HttpTaskApi, interval: Duration) -> Self {
        let auth_synced = api.has_access_token();
        Self::new(api, interval, auth_synced)
    }
}

impl<A: TaskApi + 'static> PollingTransport<A> {
    pub fn new(api: A, interval: Duration, auth_synced: bool) -> Self {
        Self {
            api: Arc::new(api),
            interval: interval.max(Duration::from_millis(10)),
            auth_synced,
        }
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: TaskApi + 'static> SnapshotTransport for PollingTransport<A> {
    fn auth_synced(&self) -> bool {
        self.auth_synced
    }

    fn listen(
        &self,
        query: OwnershipQuery,
        sink: EventSink,
    ) -> Result<Box<dyn ListenHandle>, SubscriptionError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|error| {
            SubscriptionError::Transport(format!("polling needs a tokio runtime: {error}"))
        })?;

        let api = Arc::clone(&self.api);
        let interval = self.interval;
        info!(owner = query.owner_id(), ?interval, "Starting task polling");

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tracker = SnapshotTracker::new();
            loop {
                ticker.tick().await;
                match api.list_tasks(query.owner_id()).await {
                    Ok(tasks) => {
                        let visible = tasks
                            .into_iter()
                            .filter(|task| query.matches(task))
                            .collect();
                        if let Some(batch) = tracker.observe(visible) {
                            debug!(count = batch.len(), "Polled task set changed");
                            sink(TransportEvent::Snapshot(batch));
                        }
                    }
                    Err(error) => {
                        if let Some(event) = tracker.fail(&error) {
                            sink(TransportEvent::Failed(event));
                        }
                    }
                }
            }
        });

        Ok(Box::new(PollingHandle { task: Some(task) }))
    }
}

struct PollingHandle {
    task: Option<JoinHandle<()>>,
}

impl ListenHandle for PollingHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped task polling");
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.close();
    }
}
