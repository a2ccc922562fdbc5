//! Canonical client-visible task list.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Task, TaskId};

/// Ordered task collection where no two entries share an id.
///
/// Mutations report whether the visible list changed so callers can skip
/// downstream work such as reminder reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Merge `batch` by id. Entries in `batch` win and come first, in batch
    /// order; existing entries the batch does not mention follow.
    pub fn replace_all(&mut self, batch: Vec<Task>) -> bool {
        let batch = first_occurrences(batch);
        let incoming: HashSet<TaskId> = batch.iter().map(|task| task.id.clone()).collect();
        let mut merged = batch;
        merged.extend(
            self.tasks
                .iter()
                .filter(|task| !incoming.contains(&task.id))
                .cloned(),
        );
        self.commit(merged, "merge")
    }

    /// Replace the whole collection with an authoritative full snapshot.
    ///
    /// Tasks missing from `batch` were deleted or are no longer visible to
    /// the owner and are dropped.
    pub fn apply_snapshot(&mut self, batch: Vec<Task>) -> bool {
        let batch = first_occurrences(batch);
        self.commit(batch, "snapshot")
    }

    /// Insert at the front when new, otherwise replace in place.
    pub fn upsert(&mut self, task: Task) -> bool {
        let changed = match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) if *existing == task => false,
            Some(existing) => {
                *existing = task;
                true
            }
            None => {
                self.tasks.insert(0, task);
                true
            }
        };
        self.check_invariant();
        changed
    }

    /// Delete by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        before != self.tasks.len()
    }

    /// No two entries share an id.
    #[must_use]
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.tasks.len());
        self.tasks.iter().all(|task| seen.insert(&task.id))
    }

    fn commit(&mut self, next: Vec<Task>, kind: &str) -> bool {
        let changed = next != self.tasks;
        if changed {
            debug!(
                kind,
                before = self.tasks.len(),
                after = next.len(),
                "Task store updated"
            );
            self.tasks = next;
        }
        self.check_invariant();
        changed
    }

    fn check_invariant(&self) {
        debug_assert!(self.has_unique_ids(), "task store holds duplicate ids");
    }
}

fn first_occurrences(batch: Vec<Task>) -> Vec<Task> {
    crate::subscription::dedup_by_id(batch)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::sample_task;

    fn ids(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn replace_all_merges_with_new_entries_winning() {
        let mut store = TaskStore::new();
        store.replace_all(vec![
            sample_task("a", false, "2030-01-01"),
            sample_task("b", false, "2030-01-02"),
        ]);

        let mut renamed = sample_task("b", false, "2030-01-02");
        renamed.title = "Renamed".to_string();
        assert!(store.replace_all(vec![renamed, sample_task("c", false, "2030-01-03")]));

        assert_eq!(ids(&store), vec!["b", "c", "a"]);
        assert_eq!(store.get(&TaskId::new("b")).unwrap().title, "Renamed");
    }

    #[test]
    fn apply_snapshot_drops_missing_tasks() {
        let mut store = TaskStore::new();
        store.apply_snapshot(vec![
            sample_task("a", false, "2030-01-01"),
            sample_task("b", false, "2030-01-02"),
        ]);
        assert!(store.apply_snapshot(vec![sample_task("b", false, "2030-01-02")]));
        assert_eq!(ids(&store), vec!["b"]);
        assert!(!store.apply_snapshot(vec![sample_task("b", false, "2030-01-02")]));
    }

    #[test]
    fn upsert_inserts_at_front_or_replaces_in_place() {
        let mut store = TaskStore::new();
        store.replace_all(vec![
            sample_task("a", false, "2030-01-01"),
            sample_task("b", false, "2030-01-02"),
        ]);

        assert!(store.upsert(sample_task("new", false, "2030-02-01")));
        assert_eq!(ids(&store), vec!["new", "a", "b"]);

        let mut completed = sample_task("a", true, "2030-01-01");
        completed.version = 2;
        assert!(store.upsert(completed));
        assert_eq!(ids(&store), vec!["new", "a", "b"]);
        assert!(store.get(&TaskId::new("a")).unwrap().is_completed);

        assert!(!store.upsert(sample_task("b", false, "2030-01-02")));
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut store = TaskStore::new();
        store.upsert(sample_task("a", false, "2030-01-01"));
        assert!(!store.remove(&TaskId::new("zzz")));
        assert!(store.remove(&TaskId::new("a")));
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_ids_never_survive_any_batch_sequence() {
        let mut store = TaskStore::new();
        let batches = vec![
            vec![
                sample_task("a", false, "2030-01-01"),
                sample_task("a", true, "2030-01-05"),
                sample_task("b", false, "2030-01-02"),
            ],
            vec![
                sample_task("b", true, "2030-01-02"),
                sample_task("b", false, "2030-01-09"),
            ],
            vec![
                sample_task("c", false, "2030-01-03"),
                sample_task("a", false, "2030-01-01"),
                sample_task("c", false, "2030-01-04"),
            ],
        ];
        for batch in batches {
            store.replace_all(batch);
            assert!(store.has_unique_ids());
            store.upsert(sample_task("a", false, "2030-01-07"));
            assert!(store.has_unique_ids());
        }
        assert_eq!(store.len(), 3);
        // Within a batch the first delivery of an id wins.
        assert!(store.get(&TaskId::new("b")).unwrap().is_completed);
    }
}
