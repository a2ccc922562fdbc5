//! Sync state published by the connectivity monitor.

/// Unified sync state reported to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Offline,
    /// Subscribed, waiting for the first snapshot.
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
