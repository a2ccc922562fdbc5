//! Connectivity-driven subscription lifecycle.
//!
//! Offline tears the live subscription down; online always builds a fresh
//! one. Stale handles are never resumed.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::SubscriptionError;
use crate::state::SyncState;
use crate::subscription::{
    DataCallback, ErrorCallback, LiveSubscriptionManager, SnapshotTransport, Subscription,
};

pub struct ConnectivityMonitor<T> {
    manager: LiveSubscriptionManager<T>,
    owner_id: String,
    on_data: DataCallback,
    on_error: ErrorCallback,
    subscription: Option<Subscription>,
    online: Option<bool>,
    state: Arc<watch::Sender<SyncState>>,
}

impl<T: SnapshotTransport + 'static> ConnectivityMonitor<T> {
    pub fn new<D, E>(
        manager: LiveSubscriptionManager<T>,
        owner_id: impl Into<String>,
        on_data: D,
        on_error: E,
    ) -> Self
    where
        D: Fn(Vec<crate::models::Task>) + Send + Sync + 'static,
        E: Fn(SubscriptionError) + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(SyncState::Offline);
        Self {
            manager,
            owner_id: owner_id.into(),
            on_data: Arc::new(on_data),
            on_error: Arc::new(on_error),
            subscription: None,
            online: None,
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// React to an online/offline signal. Repeats of the last signal are
    /// ignored; returns whether anything happened.
    pub fn handle_signal(&mut self, online: bool) -> bool {
        if self.online == Some(online) {
            debug!(online, "Ignoring repeated connectivity signal");
            return false;
        }
        self.online = Some(online);
        if online {
            self.connect();
        } else {
            self.disconnect();
        }
        true
    }

    /// Follow `signals` until its sender goes away, then close the
    /// subscription.
    pub async fn run(mut self, mut signals: watch::Receiver<bool>) {
        let initial = *signals.borrow_and_update();
        self.handle_signal(initial);
        while signals.changed().await.is_ok() {
            let online = *signals.borrow_and_update();
            self.handle_signal(online);
        }
        self.close();
        info!("Connectivity monitor stopped");
    }

    /// Drop the current subscription without reporting anything.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.state.send_replace(SyncState::Offline);
    }

    fn connect(&mut self) {
        // A reconnect never reuses an earlier handle.
        if let Some(stale) = self.subscription.take() {
            stale.unsubscribe();
        }
        info!(owner = %self.owner_id, "Online; opening a fresh subscription");
        self.state.send_replace(SyncState::Syncing);

        let on_data = Arc::clone(&self.on_data);
        let data_state = Arc::clone(&self.state);
        let on_error = Arc::clone(&self.on_error);
        let error_state = Arc::clone(&self.state);

        let subscription = self.manager.subscribe(
            &self.owner_id,
            move |tasks| {
                data_state.send_if_modified(|state| {
                    let modified = *state != SyncState::Synced;
                    *state = SyncState::Synced;
                    modified
                });
                on_data(tasks);
            },
            move |error| {
                let next = if error == SubscriptionError::Offline {
                    SyncState::Offline
                } else {
                    SyncState::Error
                };
                error_state.send_replace(next);
                on_error(error);
            },
        );

        if !subscription.is_active() {
            self.state.send_replace(SyncState::Error);
        }
        self.subscription = Some(subscription);
    }

    fn disconnect(&mut self) {
        info!(owner = %self.owner_id, "Offline; closing subscription");
        if let Some(subscription) = &self.subscription {
            subscription.report_error(SubscriptionError::Offline);
        }
        self.close();
    }
}
