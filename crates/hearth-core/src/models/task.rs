//! Task model

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version assigned by the backend to a freshly created task.
pub const INITIAL_VERSION: u64 = 1;

/// Opaque task identifier assigned by the backing store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an identifier handed out by the backend.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Task ID cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Task priority. Ordering is `High > Medium > Low` and is used for display only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(Error::InvalidInput(format!(
                "Unknown priority '{other}' (expected High, Medium, or Low)"
            ))),
        }
    }
}

/// Time of day for a reminder, independent of the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    /// 09:00, used when a task has no usable reminder time.
    pub const DEFAULT: Self = Self { hour: 9, minute: 0 };

    /// Parse `HH:MM` with hours 0-23 and minutes 0-59.
    pub fn parse(value: &str) -> Option<Self> {
        let re = Regex::new(r"^(\d{1,2}):(\d{2})$").expect("Invalid regex");
        let caps = re.captures(value.trim())?;
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    #[must_use]
    pub const fn hour(self) -> u32 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u32 {
        self.minute
    }

    /// Convert to a wall-clock time.
    #[must_use]
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

const fn initial_version() -> u64 {
    INITIAL_VERSION
}

/// A synchronized household task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, stable for the task's lifetime
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Household member the task is assigned to
    pub assigned_to: String,
    /// Household member who created the task; never changes
    pub created_by: String,
    /// Calendar date in local time, never shifted through UTC
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_completed: bool,
    /// Free-text labels, opaque to the sync layer
    #[serde(default)]
    pub categories: Vec<String>,
    /// Optimistic-concurrency token maintained by the backend
    #[serde(default = "initial_version")]
    pub version: u64,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    /// Raw `HH:MM` reminder time as stored remotely
    #[serde(default)]
    pub reminder_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether `owner` created the task or has it assigned.
    #[must_use]
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.created_by == owner || self.assigned_to == owner
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_completed
    }

    /// Parsed reminder time, if one is set and well formed.
    #[must_use]
    pub fn parsed_reminder_time(&self) -> Option<ReminderTime> {
        self.reminder_time.as_deref().and_then(ReminderTime::parse)
    }
}

/// Draft for a task that does not exist on the backend yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assigned_to: String,
    pub created_by: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
}

impl NewTask {
    /// Create a draft owned and assigned by `creator`.
    #[must_use]
    pub fn new(title: impl Into<String>, creator: impl Into<String>, due_date: NaiveDate) -> Self {
        let creator = creator.into();
        Self {
            title: title.into(),
            description: None,
            assigned_to: creator.clone(),
            created_by: creator,
            due_date,
            priority: Priority::default(),
            categories: Vec::new(),
            reminder_time: None,
        }
    }

    /// Normalize and validate the draft.
    ///
    /// Titles and member ids are trimmed and must be non-empty, empty
    /// descriptions are dropped, categories are deduplicated
    /// case-insensitively (first spelling wins), and a reminder time must be
    /// a valid `HH:MM`.
    pub fn validated(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("Task title cannot be empty".to_string()));
        }

        let assigned_to = required_member(&self.assigned_to, "assignedTo")?;
        let created_by = required_member(&self.created_by, "createdBy")?;

        let description = crate::util::normalize_text_option(self.description);

        let mut seen = HashSet::new();
        let categories = self
            .categories
            .into_iter()
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .filter(|category| seen.insert(category.to_lowercase()))
            .collect();

        let reminder_time = match crate::util::normalize_text_option(self.reminder_time) {
            Some(raw) => {
                let parsed = ReminderTime::parse(&raw).ok_or_else(|| {
                    Error::InvalidInput(format!("Reminder time '{raw}' is not a valid HH:MM"))
                })?;
                Some(parsed.to_string())
            }
            None => None,
        };

        Ok(Self {
            title,
            description,
            assigned_to,
            created_by,
            due_date: self.due_date,
            priority: self.priority,
            categories,
            reminder_time,
        })
    }
}

fn required_member(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::InvalidInput(format!("{field} cannot be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}
