//! Serialized owner of the task store.
//!
//! Every store mutation, whether a pushed batch or a local optimistic write,
//! goes through one command queue drained by a single tokio task. Reminder
//! reconciliation runs on the same task, only when the ordered list changed.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Task, TaskId};
use crate::reminders::{NotificationScheduler, ReconcileReport, ReminderIdStore, ReminderScheduler};
use crate::store::TaskStore;

/// How a batch relates to what the store already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// The full matching set; anything missing is gone.
    Snapshot,
    /// A partial push merged by id.
    Incremental,
}

enum EngineCommand {
    ApplyBatch {
        kind: BatchKind,
        tasks: Vec<Task>,
    },
    Upsert(Box<Task>),
    Remove(TaskId),
    Snapshot(oneshot::Sender<Vec<Task>>),
    Reconcile(oneshot::Sender<ReconcileReport>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front door to a running [`SyncEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    tasks: watch::Receiver<Vec<Task>>,
}

impl EngineHandle {
    fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::EngineStopped("command queue closed".to_string()))
    }

    pub fn apply_snapshot(&self, tasks: Vec<Task>) -> Result<()> {
        self.send(EngineCommand::ApplyBatch {
            kind: BatchKind::Snapshot,
            tasks,
        })
    }

    pub fn apply_incremental(&self, tasks: Vec<Task>) -> Result<()> {
        self.send(EngineCommand::ApplyBatch {
            kind: BatchKind::Incremental,
            tasks,
        })
    }

    /// Reflect a confirmed or optimistic local write.
    pub fn upsert(&self, task: Task) -> Result<()> {
        self.send(EngineCommand::Upsert(Box::new(task)))
    }

    pub fn remove(&self, id: TaskId) -> Result<()> {
        self.send(EngineCommand::Remove(id))
    }

    /// Current ordered list, after every previously sent command.
    pub async fn snapshot(&self) -> Result<Vec<Task>> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(tx))?;
        rx.await
            .map_err(|e| Error::EngineStopped(format!("snapshot response dropped: {e}")))
    }

    /// Force a reminder sweep over the current list.
    pub async fn reconcile_reminders(&self) -> Result<ReconcileReport> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Reconcile(tx))?;
        rx.await
            .map_err(|e| Error::EngineStopped(format!("reconcile response dropped: {e}")))
    }

    /// Receives the ordered list each time it changes.
    #[must_use]
    pub fn subscribe_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.clone()
    }

    /// An `on_data` callback feeding full snapshots into the engine.
    pub fn data_callback(&self) -> impl Fn(Vec<Task>) + Send + Sync + 'static {
        let commands = self.commands.clone();
        move |tasks| {
            let command = EngineCommand::ApplyBatch {
                kind: BatchKind::Snapshot,
                tasks,
            };
            if commands.send(command).is_err() {
                debug!("Dropping task batch; sync engine has stopped");
            }
        }
    }

    /// Stop the engine after it drains earlier commands.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown(tx))?;
        rx.await
            .map_err(|e| Error::EngineStopped(format!("shutdown ack dropped: {e}")))
    }
}

pub struct SyncEngine<N, S> {
    store: TaskStore,
    reminders: ReminderScheduler<N, S>,
    commands: mpsc::UnboundedReceiver<EngineCommand>,
    tasks: watch::Sender<Vec<Task>>,
}

impl<N, S> SyncEngine<N, S>
where
    N: NotificationScheduler + 'static,
    S: ReminderIdStore + 'static,
{
    #[must_use]
    pub fn new(reminders: ReminderScheduler<N, S>) -> (EngineHandle, Self) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (tasks_tx, tasks_rx) = watch::channel(Vec::new());
        (
            EngineHandle {
                commands: commands_tx,
                tasks: tasks_rx,
            },
            Self {
                store: TaskStore::new(),
                reminders,
                commands: commands_rx,
                tasks: tasks_tx,
            },
        )
    }

    /// Build the engine and run it on the current tokio runtime.
    pub fn spawn(reminders: ReminderScheduler<N, S>) -> (EngineHandle, JoinHandle<()>) {
        let (handle, engine) = Self::new(reminders);
        (handle, tokio::spawn(engine.run()))
    }

    pub async fn run(mut self) {
        info!("Sync engine started");
        while let Some(command) = self.commands.recv().await {
            match command {
                EngineCommand::ApplyBatch { kind, tasks } => {
                    let changed = match kind {
                        BatchKind::Snapshot => self.store.apply_snapshot(tasks),
                        BatchKind::Incremental => self.store.replace_all(tasks),
                    };
                    self.after_mutation(changed).await;
                }
                EngineCommand::Upsert(task) => {
                    let changed = self.store.upsert(*task);
                    self.after_mutation(changed).await;
                }
                EngineCommand::Remove(id) => {
                    let changed = self.store.remove(&id);
                    self.after_mutation(changed).await;
                }
                EngineCommand::Snapshot(reply) => {
                    let _ = reply.send(self.store.tasks().to_vec());
                }
                EngineCommand::Reconcile(reply) => {
                    let report = self.reminders.reconcile(self.store.tasks()).await;
                    let _ = reply.send(report);
                }
                EngineCommand::Shutdown(reply) => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
        info!("Sync engine stopped");
    }

    async fn after_mutation(&mut self, changed: bool) {
        if !changed {
            return;
        }
        let tasks = self.store.tasks().to_vec();
        self.tasks.send_replace(tasks);
        self.reminders.reconcile(self.store.tasks()).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::reminders::InMemoryReminderIds;
    use crate::testing::{fixed_clock, sample_task, RecordingNotifier};

    fn spawn_engine() -> (EngineHandle, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = ReminderScheduler::new(Arc::clone(&notifier), InMemoryReminderIds::new())
            .with_clock(fixed_clock("2030-01-01T12:00:00Z"));
        let (handle, _join) = SyncEngine::spawn(scheduler);
        (handle, notifier)
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshots_replace_and_schedule_reminders() {
        let (engine, notifier) = spawn_engine();
        engine
            .apply_snapshot(vec![
                sample_task("a", false, "2030-06-01"),
                sample_task("b", true, "2030-06-02"),
            ])
            .unwrap();

        assert_eq!(ids(&engine.snapshot().await.unwrap()), vec!["a", "b"]);
        let scheduled = notifier.list_scheduled().await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].payload.task_id.as_str(), "a");

        engine.apply_snapshot(vec![sample_task("b", true, "2030-06-02")]).unwrap();
        assert_eq!(ids(&engine.snapshot().await.unwrap()), vec!["b"]);
        assert!(notifier.list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unchanged_batches_skip_reconciliation() {
        let (engine, notifier) = spawn_engine();
        let batch = vec![sample_task("a", false, "2030-06-01")];

        engine.apply_snapshot(batch.clone()).unwrap();
        engine.apply_snapshot(batch).unwrap();
        engine.snapshot().await.unwrap();

        assert_eq!(notifier.schedule_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_writes_are_serialized_with_pushes() {
        let (engine, _notifier) = spawn_engine();
        let mut watcher = engine.subscribe_tasks();
        let push = engine.data_callback();

        push(vec![sample_task("a", false, "2030-06-01")]);
        engine.upsert(sample_task("new", false, "2030-06-05")).unwrap();
        engine.apply_incremental(vec![sample_task("a", true, "2030-06-01")]).unwrap();
        engine.remove(TaskId::new("missing")).unwrap();

        let tasks = engine.snapshot().await.unwrap();
        assert_eq!(ids(&tasks), vec!["a", "new"]);
        assert!(tasks[0].is_completed);

        watcher.changed().await.unwrap();
        assert_eq!(ids(&watcher.borrow_and_update()), vec!["a", "new"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completing_a_task_cancels_its_reminder() {
        let (engine, notifier) = spawn_engine();
        engine.upsert(sample_task("a", false, "2030-06-01")).unwrap();
        engine.snapshot().await.unwrap();
        assert_eq!(notifier.list_scheduled().await.unwrap().len(), 1);

        let mut done = sample_task("a", true, "2030-06-01");
        done.version = 2;
        engine.upsert(done).unwrap();
        let report = engine.reconcile_reminders().await.unwrap();

        assert!(report.scheduled.is_empty());
        assert!(notifier.list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn commands_fail_after_shutdown() {
        let (engine, _notifier) = spawn_engine();
        engine.shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let error = engine.snapshot().await.unwrap_err();
        assert!(matches!(error, Error::EngineStopped(_)));
    }
}
