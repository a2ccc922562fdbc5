//! Listener registry owned by a subscription manager instance.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SubscriptionError;
use crate::models::Task;

/// Receives normalized task batches.
pub type DataCallback = Arc<dyn Fn(Vec<Task>) + Send + Sync>;

/// Receives subscription failures.
pub type ErrorCallback = Arc<dyn Fn(SubscriptionError) + Send + Sync>;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Listener {
    on_data: DataCallback,
    on_error: ErrorCallback,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Listener>,
}

/// Registered data/error callbacks, keyed by listener id.
///
/// Callbacks run outside the internal lock, so a callback may remove its own
/// listener (or any other) without deadlocking.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Entries>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // Callbacks never run under the lock, so poisoning only follows a
        // panic inside this module; the map itself stays consistent.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn add(&self, on_data: DataCallback, on_error: ErrorCallback) -> ListenerId {
        let mut entries = self.entries();
        let id = ListenerId(entries.next_id);
        entries.next_id += 1;
        entries
            .listeners
            .insert(id, Listener { on_data, on_error });
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.entries().listeners.remove(&id).is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries().listeners.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn listener(&self, id: ListenerId) -> Option<Listener> {
        self.entries().listeners.get(&id).cloned()
    }

    /// Deliver a batch to one listener. Returns `false` if it is gone.
    pub fn notify_data(&self, id: ListenerId, tasks: Vec<Task>) -> bool {
        let Some(listener) = self.listener(id) else {
            return false;
        };
        (listener.on_data)(tasks);
        true
    }

    /// Deliver an error to one listener. Returns `false` if it is gone.
    pub fn notify_error(&self, id: ListenerId, error: SubscriptionError) -> bool {
        let Some(listener) = self.listener(id) else {
            return false;
        };
        (listener.on_error)(error);
        true
    }

    /// Deliver an error to every registered listener.
    pub fn notify_all(&self, error: &SubscriptionError) -> usize {
        let listeners: Vec<Listener> = self.entries().listeners.values().cloned().collect();
        for listener in &listeners {
            (listener.on_error)(error.clone());
        }
        listeners.len()
    }
}
