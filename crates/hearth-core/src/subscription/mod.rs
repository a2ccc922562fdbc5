//! Live subscription to remote task state.
//!
//! A [`LiveSubscriptionManager`] opens one push subscription per owner on a
//! [`SnapshotTransport`], normalizes every pushed batch (dedup by id, then a
//! deterministic sort) and hands it to the caller's `on_data`. Failures go to
//! `on_error` and never tear the manager down.

mod normalize;
mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::SubscriptionError;
use crate::models::Task;

pub use normalize::{compare_tasks, dedup_by_id, normalize_batch};
pub use registry::{DataCallback, ErrorCallback, ListenerId, ListenerRegistry};

/// Tasks visible to one household member: created by OR assigned to them.
///
/// Transports must evaluate both fields inside a single query so every
/// snapshot is taken at one consistent boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipQuery {
    owner_id: String,
}

impl OwnershipQuery {
    /// Returns `None` for a blank owner.
    pub fn new(owner_id: &str) -> Option<Self> {
        let owner_id = owner_id.trim();
        (!owner_id.is_empty()).then(|| Self {
            owner_id: owner_id.to_string(),
        })
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Client-side evaluation of the predicate.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.is_owned_by(&self.owner_id)
    }
}

/// Something a transport reports for an open query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The full matching set after a change.
    Snapshot(Vec<Task>),
    Failed(SubscriptionError),
}

/// Callback a transport invokes for each event on an open query.
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Handle to an open transport query.
pub trait ListenHandle: Send {
    /// Stop delivering events. Must tolerate repeated calls.
    fn close(&mut self);
}

/// Document-store style push primitive.
pub trait SnapshotTransport: Send + Sync {
    /// Whether the transport's own auth handshake has completed.
    fn auth_synced(&self) -> bool;

    /// Start delivering full-set snapshots for `query` to `sink`.
    fn listen(
        &self,
        query: OwnershipQuery,
        sink: EventSink,
    ) -> Result<Box<dyn ListenHandle>, SubscriptionError>;
}

/// Opens subscriptions and routes their events to registered listeners.
pub struct LiveSubscriptionManager<T> {
    transport: Arc<T>,
    registry: Arc<ListenerRegistry>,
}

impl<T> Clone for LiveSubscriptionManager<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: SnapshotTransport> LiveSubscriptionManager<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            registry: Arc::new(ListenerRegistry::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of live subscriptions.
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Subscribe to every task `owner_id` created or is assigned.
    ///
    /// A blank owner or an unsynced transport login is reported through
    /// `on_error`, followed by an empty `on_data`, without opening the
    /// transport. The returned handle unsubscribes on drop.
    pub fn subscribe<D, E>(&self, owner_id: &str, on_data: D, on_error: E) -> Subscription
    where
        D: Fn(Vec<Task>) + Send + Sync + 'static,
        E: Fn(SubscriptionError) + Send + Sync + 'static,
    {
        let Some(query) = OwnershipQuery::new(owner_id) else {
            tracing::warn!("Refusing to subscribe without an owner id");
            on_error(SubscriptionError::InvalidOwner);
            on_data(Vec::new());
            return Subscription::inert();
        };

        if !self.transport.auth_synced() {
            tracing::warn!(owner = query.owner_id(), "Push transport auth not synced");
            on_error(SubscriptionError::AuthNotSynced);
            on_data(Vec::new());
            return Subscription::inert();
        }

        let id = self.registry.add(Arc::new(on_data), Arc::new(on_error));
        let sink = event_sink(Arc::downgrade(&self.registry), id);

        tracing::info!(owner = query.owner_id(), "Opening live task subscription");
        match self.transport.listen(query, sink) {
            Ok(handle) => Subscription {
                inner: Some(Arc::new(SubscriptionInner {
                    id,
                    registry: Arc::downgrade(&self.registry),
                    handle: Mutex::new(Some(handle)),
                    active: AtomicBool::new(true),
                })),
            },
            Err(error) => {
                tracing::warn!("Failed to open live subscription: {error}");
                self.registry.notify_error(id, error);
                self.registry.remove(id);
                Subscription::inert()
            }
        }
    }

    /// Report an error to every active subscription.
    pub fn broadcast_error(&self, error: &SubscriptionError) -> usize {
        self.registry.notify_all(error)
    }
}

fn event_sink(registry: Weak<ListenerRegistry>, id: ListenerId) -> EventSink {
    // One report per failure streak; a delivered snapshot re-arms it.
    let error_reported = AtomicBool::new(false);
    Arc::new(move |event: TransportEvent| {
        let Some(registry) = registry.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Snapshot(tasks) => {
                error_reported.store(false, Ordering::SeqCst);
                let batch = normalize_batch(tasks);
                tracing::debug!(listener = ?id, count = batch.len(), "Delivering task batch");
                registry.notify_data(id, batch);
            }
            TransportEvent::Failed(error) => {
                if error_reported.swap(true, Ordering::SeqCst) {
                    tracing::debug!(
                        listener = ?id,
                        "Suppressing repeated transport error: {error}"
                    );
                    return;
                }
                tracing::warn!(
                    listener = ?id,
                    code = error.code(),
                    "Live subscription error: {error}"
                );
                registry.notify_error(id, error);
            }
        }
    })
}

struct SubscriptionInner {
    id: ListenerId,
    registry: Weak<ListenerRegistry>,
    handle: Mutex<Option<Box<dyn ListenHandle>>>,
    active: AtomicBool,
}

impl SubscriptionInner {
    fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(mut handle) = handle {
            handle.close();
        }
        tracing::debug!(listener = ?self.id, "Closed live task subscription");
    }
}

/// Cancellation token for a live subscription.
///
/// `unsubscribe` is idempotent and may be called from any thread after the
/// subscriber has gone away; afterwards no callback fires again.
#[derive(Clone)]
pub struct Subscription {
    inner: Option<Arc<SubscriptionInner>>,
}

impl Subscription {
    /// A handle for a subscription that never opened.
    #[must_use]
    pub const fn inert() -> Self {
        Self { inner: None }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.active.load(Ordering::SeqCst))
    }

    pub fn unsubscribe(&self) {
        if let Some(inner) = &self.inner {
            inner.unsubscribe();
        }
    }

    /// Deliver `error` to this subscription's `on_error` only.
    ///
    /// Returns `false` once the subscription is no longer active.
    pub fn report_error(&self, error: SubscriptionError) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };
        if !inner.active.load(Ordering::SeqCst) {
            return false;
        }
        inner
            .registry
            .upgrade()
            .is_some_and(|registry| registry.notify_error(inner.id, error))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Clones share one subscription; only the last one closes it.
        if let Some(inner) = self.inner.take() {
            if Arc::strong_count(&inner) == 1 {
                inner.unsubscribe();
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
