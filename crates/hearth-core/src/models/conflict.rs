//! Version conflict model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::patch::TaskPatch;
use super::task::Task;
use crate::error::{Error, Result};

/// Describes a write rejected because the client's version was stale.
///
/// Created when the backend answers `VERSION_CONFLICT`, consumed by exactly
/// one resolution, then discarded. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDescriptor {
    /// Version currently held by the backend
    pub current_version: u64,
    /// Version the client believed was current
    pub expected_version: u64,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub last_modified_by_name: Option<String>,
    /// Full current server-side record
    pub server_task: Task,
    /// Record the client started editing from, when known
    #[serde(default)]
    pub local_task: Option<Task>,
    /// Patch the client attempted to apply
    pub local_changes: TaskPatch,
}

impl ConflictDescriptor {
    /// Human-friendly name of whoever caused the divergence.
    #[must_use]
    pub fn modified_by_label(&self) -> &str {
        self.last_modified_by_name
            .as_deref()
            .or(self.last_modified_by.as_deref())
            .unwrap_or("another household member")
    }
}

/// How to settle a version conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStrategy {
    /// Discard local edits and acknowledge the server state.
    UseServer,
    /// Resubmit local edits verbatim against the current server version.
    UseLocal,
    /// Server record with locally touched fields overwritten.
    Merge,
}

impl ResolutionStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UseServer => "useServer",
            Self::UseLocal => "useLocal",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "useserver" | "server" => Ok(Self::UseServer),
            "uselocal" | "local" => Ok(Self::UseLocal),
            "merge" => Ok(Self::Merge),
            other => Err(Error::InvalidInput(format!(
                "Unknown resolution strategy '{other}'"
            ))),
        }
    }
}
