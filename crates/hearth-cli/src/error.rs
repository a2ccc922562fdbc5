use std::io;

use hearth_core::api::ApiError;
use hearth_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] hearth_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Request failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Invalid date '{0}' (expected YYYY-MM-DD, today, or tomorrow)")]
    InvalidDate(String),
    #[error("No changes given; pass at least one field flag")]
    NoChanges,
    #[error("{0}\nRe-run with --on-conflict server|local|merge to resolve.")]
    Conflict(String),
}
