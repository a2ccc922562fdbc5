//! Error types for hearth-core

use thiserror::Error;

/// Result type alias using hearth-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hearth-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task not found
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Invalid input, rejected before any write is attempted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The sync engine task has stopped
    #[error("Sync engine stopped: {0}")]
    EngineStopped(String),
}

/// Errors delivered through a live subscription's `on_error` callback.
///
/// These never cross the subscription boundary as panics or `Err` returns;
/// the caller decides whether to resubscribe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The push transport has not caught up with the caller's login yet.
    #[error("Push transport authentication is not established; sign in again")]
    AuthNotSynced,

    /// The owner identifier was empty.
    #[error("Owner identifier must not be empty")]
    InvalidOwner,

    /// Network drop, server unavailable, or a rejected query.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connectivity was lost while the subscription was active.
    #[error("Network is offline")]
    Offline,
}

impl SubscriptionError {
    /// Stable machine-readable code for UI branching.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AuthNotSynced => "AUTH_NOT_SYNCED",
            Self::InvalidOwner => "INVALID_OWNER",
            Self::Transport(_) => "TRANSPORT",
            Self::Offline => "OFFLINE",
        }
    }

    /// Whether reconnecting and resubscribing can be expected to help.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Offline)
    }
}
