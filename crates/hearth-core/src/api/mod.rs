//! Remote write API contract.
//!
//! Writes are request/response. A successful response is reflected
//! optimistically by the caller; the live subscription remains the source of
//! truth and confirms or corrects it on a later push.

mod http;
mod wire;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::models::{ConflictDescriptor, NewTask, Task, TaskId, TaskPatch};

pub use http::HttpTaskApi;

/// Structured failure codes for remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// Rejected locally before anything was sent
    Validation,
    NotFound,
    Unauthorized,
    /// The request never got a response
    Network,
    /// The backend answered with an unexpected failure
    Server,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Network => "NETWORK",
            Self::Server => "SERVER",
        }
    }

    /// Map a backend `errorCode` string.
    #[must_use]
    pub fn from_wire(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "VALIDATION" | "VALIDATION_ERROR" | "INVALID_INPUT" => Self::Validation,
            "NOT_FOUND" | "TASK_NOT_FOUND" => Self::NotFound,
            "UNAUTHORIZED" | "FORBIDDEN" | "PERMISSION_DENIED" => Self::Unauthorized,
            _ => Self::Server,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed write, carried as a value rather than a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = match &error {
            Error::InvalidInput(_) => ApiErrorCode::Validation,
            Error::NotFound(_) => ApiErrorCode::NotFound,
            Error::Http(_) => ApiErrorCode::Network,
            _ => ApiErrorCode::Server,
        };
        let message = match error {
            Error::InvalidInput(message) => message,
            other => other.to_string(),
        };
        Self { code, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        let code = if error.is_decode() {
            ApiErrorCode::Server
        } else {
            ApiErrorCode::Network
        };
        Self::new(code, error.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Result of an update with an optimistic-concurrency token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Task),
    /// `VERSION_CONFLICT`: an expected, recoverable branch, not a failure.
    Conflict(Box<ConflictDescriptor>),
}

/// Backend write operations.
pub trait TaskApi: Send + Sync {
    /// Create a task. Invalid drafts fail with `VALIDATION` and are never sent.
    fn create_task(&self, draft: &NewTask) -> impl Future<Output = ApiResult<Task>> + Send;

    /// Apply `patch`. When `patch.version` is set the backend accepts the
    /// write only if it equals the current version; without it, no check.
    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = ApiResult<UpdateOutcome>> + Send;

    fn delete_task(&self, id: &TaskId) -> impl Future<Output = ApiResult<()>> + Send;

    /// Full set of tasks `owner_id` created or is assigned.
    fn list_tasks(&self, owner_id: &str) -> impl Future<Output = ApiResult<Vec<Task>>> + Send;

    /// Flip completion, guarded by the task's observed version.
    fn toggle_completion(
        &self,
        task: &Task,
    ) -> impl Future<Output = ApiResult<UpdateOutcome>> + Send {
        let id = task.id.clone();
        let patch = TaskPatch {
            is_completed: Some(!task.is_completed),
            ..TaskPatch::default()
        }
        .with_version(task.version);
        async move { self.update_task(&id, &patch).await }
    }
}
