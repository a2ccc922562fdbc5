//! Partial task updates

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::task::{Priority, Task};

/// A partial update to a task.
///
/// Absent keys are left untouched. `description` and `reminder_time` use a
/// nested option so that "clear the value" (`Some(None)`) differs from "not
/// touched" (`None`). `version` is the optimistic-concurrency token; leaving
/// it out asks the backend to skip the version check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder_time: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// A key that is present in JSON, even as `null`, deserializes to `Some`.
fn present_value<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    /// Every mutable field of `task`, carrying `task.version`.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            assigned_to: Some(task.assigned_to.clone()),
            due_date: Some(task.due_date),
            priority: Some(task.priority),
            is_completed: Some(task.is_completed),
            categories: Some(task.categories.clone()),
            reminder_time: Some(task.reminder_time.clone()),
            version: Some(task.version),
        }
    }

    /// Set the optimistic-concurrency token.
    #[must_use]
    pub const fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Drop the optimistic-concurrency token.
    #[must_use]
    pub const fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    /// Layer `other` on top of `self`: keys present in `other` win.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            title: other.title.clone().or_else(|| self.title.clone()),
            description: other
                .description
                .clone()
                .or_else(|| self.description.clone()),
            assigned_to: other
                .assigned_to
                .clone()
                .or_else(|| self.assigned_to.clone()),
            due_date: other.due_date.or(self.due_date),
            priority: other.priority.or(self.priority),
            is_completed: other.is_completed.or(self.is_completed),
            categories: other
                .categories
                .clone()
                .or_else(|| self.categories.clone()),
            reminder_time: other
                .reminder_time
                .clone()
                .or_else(|| self.reminder_time.clone()),
            version: other.version.or(self.version),
        }
    }

    /// Apply the field changes to a copy of `task`.
    ///
    /// The version is left alone; only the backend advances it.
    #[must_use]
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut updated = task.clone();
        if let Some(title) = &self.title {
            updated.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            updated.description.clone_from(description);
        }
        if let Some(assigned_to) = &self.assigned_to {
            updated.assigned_to.clone_from(assigned_to);
        }
        if let Some(due_date) = self.due_date {
            updated.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            updated.priority = priority;
        }
        if let Some(is_completed) = self.is_completed {
            updated.is_completed = is_completed;
        }
        if let Some(categories) = &self.categories {
            updated.categories.clone_from(categories);
        }
        if let Some(reminder_time) = &self.reminder_time {
            updated.reminder_time.clone_from(reminder_time);
        }
        updated
    }

    /// Names of the fields this patch touches, excluding `version`.
    #[must_use]
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.assigned_to.is_some() {
            fields.push("assignedTo");
        }
        if self.due_date.is_some() {
            fields.push("dueDate");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        if self.is_completed.is_some() {
            fields.push("isCompleted");
        }
        if self.categories.is_some() {
            fields.push("categories");
        }
        if self.reminder_time.is_some() {
            fields.push("reminderTime");
        }
        fields
    }

    /// True when no field (other than `version`) is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }
}
