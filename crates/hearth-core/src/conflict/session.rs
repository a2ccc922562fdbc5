//! State machine for a single edit attempt.

use tracing::{debug, info};

use super::resolve_conflict;
use crate::api::{ApiError, TaskApi, UpdateOutcome};
use crate::error::{Error, Result};
use crate::models::{ConflictDescriptor, ResolutionStrategy, Task, TaskPatch};

/// Where an edit attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Editing,
    Submitting,
    Succeeded(Task),
    /// Waiting for an explicit strategy; never resolved automatically.
    ConflictDetected(Box<ConflictDescriptor>),
    Resolving(ResolutionStrategy),
    /// The write failed for a reason other than a conflict. Submitting
    /// again retries the same patch.
    Failed(ApiError),
}

impl EditState {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Submitting => "submitting",
            Self::Succeeded(_) => "succeeded",
            Self::ConflictDetected(_) => "conflict",
            Self::Resolving(_) => "resolving",
            Self::Failed(_) => "failed",
        }
    }
}

/// One edit of one task, from first keystroke to an accepted write.
///
/// ```text
/// Editing -> Submitting -> Succeeded
///                       -> ConflictDetected -> Resolving -> Submitting
///                       -> Failed -> Submitting
/// ```
#[derive(Debug)]
pub struct EditSession {
    base: Task,
    changes: TaskPatch,
    conflict: Option<ConflictDescriptor>,
    attempt: Option<TaskPatch>,
    state: EditState,
}

impl EditSession {
    /// Start editing from the task as last observed.
    #[must_use]
    pub fn new(base: Task) -> Self {
        Self {
            base,
            changes: TaskPatch::default(),
            conflict: None,
            attempt: None,
            state: EditState::Editing,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &EditState {
        &self.state
    }

    #[must_use]
    pub const fn base(&self) -> &Task {
        &self.base
    }

    /// Local changes accumulated so far, without a version.
    #[must_use]
    pub const fn changes(&self) -> &TaskPatch {
        &self.changes
    }

    #[must_use]
    pub const fn conflict(&self) -> Option<&ConflictDescriptor> {
        self.conflict.as_ref()
    }

    /// Layer more field changes onto the pending edit.
    pub fn edit(&mut self, patch: &TaskPatch) -> Result<()> {
        if !matches!(self.state, EditState::Editing) {
            return Err(self.illegal("edit"));
        }
        self.changes = self.changes.overlay(&patch.clone().without_version());
        Ok(())
    }

    /// Choose how to settle the pending conflict. Returns the patch the next
    /// [`submit`](Self::submit) will send.
    pub fn resolve(&mut self, strategy: ResolutionStrategy) -> Result<TaskPatch> {
        let EditState::ConflictDetected(descriptor) = &self.state else {
            return Err(self.illegal("resolve"));
        };
        let patch = resolve_conflict(descriptor, strategy);
        debug!(
            task_id = %self.base.id,
            strategy = %strategy,
            version = descriptor.server_task.version,
            "Resolving version conflict"
        );
        self.conflict = Some((**descriptor).clone());
        self.attempt = Some(patch.clone());
        self.state = EditState::Resolving(strategy);
        Ok(patch)
    }

    /// Send the pending write and move to the resulting state.
    pub async fn submit<A: TaskApi>(&mut self, api: &A) -> Result<&EditState> {
        let patch = match &self.state {
            EditState::Editing => {
                if self.changes.is_empty() {
                    return Err(Error::InvalidInput("No changes to submit".to_string()));
                }
                self.changes.clone().with_version(self.base.version)
            }
            EditState::Resolving(_) | EditState::Failed(_) => match &self.attempt {
                Some(patch) => patch.clone(),
                None => return Err(self.illegal("submit")),
            },
            _ => return Err(self.illegal("submit")),
        };

        self.attempt = Some(patch.clone());
        self.state = EditState::Submitting;

        self.state = match api.update_task(&self.base.id, &patch).await {
            Ok(UpdateOutcome::Updated(task)) => {
                debug!(task_id = %task.id, version = task.version, "Edit accepted");
                self.base = task.clone();
                self.conflict = None;
                EditState::Succeeded(task)
            }
            Ok(UpdateOutcome::Conflict(mut descriptor)) => {
                descriptor.local_task = Some(self.base.clone());
                descriptor.local_changes = self.changes.clone();
                info!(
                    task_id = %self.base.id,
                    expected_version = descriptor.expected_version,
                    current_version = descriptor.current_version,
                    modified_by = descriptor.modified_by_label(),
                    "Edit hit a version conflict"
                );
                EditState::ConflictDetected(descriptor)
            }
            Err(error) => {
                debug!(task_id = %self.base.id, error = %error, "Edit failed");
                EditState::Failed(error)
            }
        };
        Ok(&self.state)
    }

    fn illegal(&self, action: &str) -> Error {
        Error::InvalidInput(format!(
            "Cannot {action} while the edit is {}",
            self.state.label()
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::ApiErrorCode;
    use crate::models::Priority;
    use crate::testing::{sample_task, FakeTaskApi};

    fn priority(priority: Priority) -> TaskPatch {
        TaskPatch {
            priority: Some(priority),
            ..TaskPatch::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clean_edit_succeeds() {
        let api = FakeTaskApi::new("alice");
        let task = sample_task("t1", false, "2030-06-01");
        api.insert(task.clone());

        let mut session = EditSession::new(task);
        session.edit(&priority(Priority::High)).unwrap();
        let state = session.submit(&api).await.unwrap().clone();

        let EditState::Succeeded(saved) = state else {
            panic!("expected success, got {state:?}");
        };
        assert_eq!(saved.priority, Priority::High);
        assert_eq!(api.updates()[0].1.version, Some(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_waits_for_explicit_strategy() {
        let api = FakeTaskApi::new("bob");
        let task = sample_task("t1", false, "2030-06-01");
        api.insert(task.clone());
        api.update_task(
            &task.id,
            &TaskPatch {
                title: Some("Bob's title".to_string()),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap();

        let mut session = EditSession::new(task.clone());
        session.edit(&priority(Priority::Low)).unwrap();
        session.submit(&api).await.unwrap();

        let EditState::ConflictDetected(descriptor) = session.state() else {
            panic!("expected conflict");
        };
        assert_eq!(descriptor.local_task.as_ref(), Some(&task));
        assert_eq!(descriptor.local_changes, priority(Priority::Low));

        // No silent retry: submitting again is illegal until a strategy is chosen.
        assert!(session.submit(&api).await.is_err());
        assert_eq!(api.updates().len(), 2);

        let patch = session.resolve(ResolutionStrategy::Merge).unwrap();
        assert_eq!(patch.version, Some(2));
        session.submit(&api).await.unwrap();

        let EditState::Succeeded(saved) = session.state() else {
            panic!("expected success after merge");
        };
        assert_eq!(saved.title, "Bob's title");
        assert_eq!(saved.priority, Priority::Low);
        assert_eq!(saved.version, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_submit_can_be_retried() {
        let api = FakeTaskApi::new("alice");
        let task = sample_task("t1", false, "2030-06-01");
        api.insert(task.clone());
        api.set_offline(true);

        let mut session = EditSession::new(task);
        session.edit(&priority(Priority::High)).unwrap();
        session.submit(&api).await.unwrap();
        assert!(matches!(
            session.state(),
            EditState::Failed(error) if error.code == ApiErrorCode::Network
        ));

        api.set_offline(false);
        session.submit(&api).await.unwrap();
        assert_eq!(session.state().label(), "succeeded");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn illegal_transitions_are_rejected() {
        let api = FakeTaskApi::new("alice");
        let mut session = EditSession::new(sample_task("t1", false, "2030-06-01"));

        assert!(session.resolve(ResolutionStrategy::UseServer).is_err());
        assert!(session.submit(&api).await.is_err());
        assert_eq!(session.state(), &EditState::Editing);
    }
}
