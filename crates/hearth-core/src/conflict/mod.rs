//! Version conflict detection and resolution.
//!
//! Both functions are pure: no I/O, inputs untouched. Resubmitting the
//! resolved patch is the caller's job (see [`EditSession`]).

mod session;

pub use session::{EditSession, EditState};

use crate::models::{ConflictDescriptor, ResolutionStrategy, TaskPatch, INITIAL_VERSION};

/// Whether two version tokens disagree. A missing version counts as the
/// initial version on either side.
#[must_use]
pub fn detect_conflict(local_version: Option<u64>, server_version: Option<u64>) -> bool {
    local_version.unwrap_or(INITIAL_VERSION) != server_version.unwrap_or(INITIAL_VERSION)
}

/// Build the patch to resubmit after a version conflict.
///
/// Every strategy carries `server_task.version` so the resubmission passes
/// the optimistic-concurrency check. `Merge` is field-level with local
/// changes winning; there is no three-way comparison against the task the
/// edit started from.
#[must_use]
pub fn resolve_conflict(conflict: &ConflictDescriptor, strategy: ResolutionStrategy) -> TaskPatch {
    let server = &conflict.server_task;
    let patch = match strategy {
        ResolutionStrategy::UseServer => TaskPatch::from_task(server),
        ResolutionStrategy::UseLocal => conflict.local_changes.clone(),
        ResolutionStrategy::Merge => {
            TaskPatch::from_task(server).overlay(&conflict.local_changes.clone().without_version())
        }
    };
    patch.with_version(server.version)
}
