//! JSON shapes exchanged with the HTTP backend.
//!
//! Everything transport-specific is normalized here: document-store
//! timestamp objects, epoch milliseconds, and date-time strings for due
//! dates all become the canonical model types before reaching the core.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::models::{ConflictDescriptor, Priority, Task, TaskId, TaskPatch, INITIAL_VERSION};

/// Response envelope: `{success, task?, tasks?, error?, errorCode?, conflict?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task: Option<WireTask>,
    #[serde(default)]
    pub tasks: Option<Vec<WireTask>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub conflict: Option<WireConflict>,
}

impl Envelope {
    pub fn error_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
    Seconds {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

impl WireTimestamp {
    fn into_utc(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(millis) => Utc.timestamp_millis_opt(millis).single(),
            Self::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
            Self::Seconds {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(seconds, nanoseconds).single(),
        }
    }
}

/// Parse a due date without any time-zone conversion.
///
/// `2025-03-02` and `2025-03-02T23:30:00Z` both mean March 2nd; only the
/// calendar date prefix is read.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    assigned_to: String,
    created_by: String,
    due_date: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    last_modified_by: Option<String>,
    #[serde(default)]
    reminder_time: Option<String>,
    #[serde(default)]
    created_at: Option<WireTimestamp>,
    #[serde(default)]
    updated_at: Option<WireTimestamp>,
}

impl TryFrom<WireTask> for Task {
    type Error = String;

    fn try_from(wire: WireTask) -> Result<Self, Self::Error> {
        let due_date = parse_due_date(&wire.due_date)
            .ok_or_else(|| format!("task {} has invalid dueDate '{}'", wire.id, wire.due_date))?;
        let priority = match wire.priority.as_deref() {
            Some(raw) => raw
                .parse::<Priority>()
                .map_err(|error| format!("task {}: {error}", wire.id))?,
            None => Priority::default(),
        };
        // Missing timestamps must decode the same way on every fetch.
        let created_at = wire
            .created_at
            .and_then(WireTimestamp::into_utc)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let updated_at = wire
            .updated_at
            .and_then(WireTimestamp::into_utc)
            .unwrap_or(created_at);

        Ok(Self {
            id: TaskId::new(wire.id),
            title: wire.title,
            description: crate::util::normalize_text_option(wire.description),
            assigned_to: wire.assigned_to,
            created_by: wire.created_by,
            due_date,
            priority,
            is_completed: wire.is_completed,
            categories: wire.categories,
            version: wire.version.unwrap_or(INITIAL_VERSION),
            last_modified_by: wire.last_modified_by,
            reminder_time: crate::util::normalize_text_option(wire.reminder_time),
            created_at,
            updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConflict {
    current_version: u64,
    expected_version: u64,
    #[serde(default)]
    last_modified_by: Option<String>,
    #[serde(default)]
    last_modified_by_name: Option<String>,
    server_task: WireTask,
}

impl WireConflict {
    /// Attach the patch that was rejected.
    pub fn into_descriptor(self, local_changes: &TaskPatch) -> Result<ConflictDescriptor, String> {
        Ok(ConflictDescriptor {
            current_version: self.current_version,
            expected_version: self.expected_version,
            last_modified_by: self.last_modified_by,
            last_modified_by_name: self.last_modified_by_name,
            server_task: self.server_task.try_into()?,
            local_task: None,
            local_changes: local_changes.clone(),
        })
    }
}
