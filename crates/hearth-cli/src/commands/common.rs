use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate};
use hearth_core::api::{HttpTaskApi, TaskApi};
use hearth_core::config::{ClientConfig, ConfigLayer};
use hearth_core::db::{Database, LibSqlNotificationQueue, LibSqlReminderIds};
use hearth_core::models::{ConflictDescriptor, ScheduledReminder, Task, TaskId};
use hearth_core::reminders::ReminderScheduler;
use hearth_core::subscription::normalize_batch;
use serde::Serialize;

use crate::cli::ConnectionArgs;
use crate::error::CliError;

pub type LocalScheduler = ReminderScheduler<LibSqlNotificationQueue, LibSqlReminderIds>;

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub due_date: String,
    pub priority: String,
    pub completed: bool,
    pub assigned_to: String,
    pub created_by: String,
    pub version: u64,
    pub reminder_time: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReminderListItem {
    pub notification_id: u32,
    pub task_id: String,
    pub title: String,
    pub trigger_at: String,
    pub due_date: String,
    pub priority: String,
}

/// Settings from the config file, then the environment, then flags.
pub fn resolve_config(args: &ConnectionArgs) -> Result<ClientConfig, CliError> {
    let file = match &args.config {
        Some(path) => ConfigLayer::from_file(path)?,
        None => ConfigLayer::default(),
    };
    let flags = ConfigLayer {
        api_base_url: args.api_url.clone(),
        owner_id: args.owner.clone(),
        database_path: args.db_path.clone(),
        ..ConfigLayer::default()
    };
    let layer = file.merge(ConfigLayer::from_env()?).merge(flags);
    Ok(ClientConfig::try_from(layer)?)
}

pub fn api_client(config: &ClientConfig) -> Result<HttpTaskApi, CliError> {
    Ok(HttpTaskApi::new(
        config.api_base_url.clone(),
        config.access_token.clone(),
    )?)
}

pub fn resolve_db_path(config: &ClientConfig) -> PathBuf {
    config
        .database_path
        .clone()
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hearth")
        .join("hearth.db")
}

/// Local reminder state: the notification queue and the id mapping.
pub struct LocalReminders {
    db: Database,
}

impl LocalReminders {
    pub async fn open(config: &ClientConfig) -> Result<Self, CliError> {
        let db = Database::open(resolve_db_path(config)).await?;
        Ok(Self { db })
    }

    pub fn queue(&self) -> LibSqlNotificationQueue {
        LibSqlNotificationQueue::new(self.db.connection().clone())
    }

    pub fn scheduler(&self, config: &ClientConfig) -> LocalScheduler {
        ReminderScheduler::new(
            self.queue(),
            LibSqlReminderIds::new(self.db.connection().clone()),
        )
        .with_default_time(config.default_reminder_time)
    }
}

pub fn normalize_task_identifier(raw: &str) -> Result<TaskId, CliError> {
    raw.parse::<TaskId>().map_err(|_| CliError::EmptyTaskId)
}

/// Look a task up in the owner's current set.
pub async fn find_task(
    api: &HttpTaskApi,
    owner_id: &str,
    id: &TaskId,
) -> Result<Task, CliError> {
    api.list_tasks(owner_id)
        .await?
        .into_iter()
        .find(|task| &task.id == id)
        .ok_or_else(|| CliError::TaskNotFound(id.to_string()))
}

pub fn parse_due_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, CliError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| CliError::InvalidDate(raw.trim().to_string())),
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn join_title(parts: &[String]) -> Result<String, CliError> {
    let title = parts.join(" ").trim().to_string();
    if title.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(title)
    }
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    TaskListItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        due_date: task.due_date.to_string(),
        priority: task.priority.to_string(),
        completed: task.is_completed,
        assigned_to: task.assigned_to.clone(),
        created_by: task.created_by.clone(),
        version: task.version,
        reminder_time: task.reminder_time.clone(),
        categories: task.categories.clone(),
    }
}

pub fn format_task_lines(tasks: &[Task], owner_id: &str) -> Vec<String> {
    normalize_batch(tasks.to_vec())
        .iter()
        .map(|task| format_task_line(task, owner_id))
        .collect()
}

pub fn format_task_line(task: &Task, owner_id: &str) -> String {
    let id = task.id.to_string();
    let short_id = id.chars().take(13).collect::<String>();
    let check = if task.is_completed { "x" } else { " " };
    let mut line = format!(
        "{short_id}  [{check}] {} {:<6} {} (v{})",
        task.due_date, task.priority, task.title, task.version
    );
    if task.assigned_to != owner_id {
        line.push_str(&format!(" @{}", task.assigned_to));
    }
    if !task.categories.is_empty() {
        line.push_str(&format!(" #{}", task.categories.join(" #")));
    }
    line
}

pub fn format_conflict(conflict: &ConflictDescriptor) -> String {
    let server = &conflict.server_task;
    let fields = conflict.local_changes.touched_fields();
    format!(
        "Version conflict on {}: you edited v{}, but {} saved v{}.\n\
         Server now has: {} | due {} | {} | {}\n\
         Your changes: {}",
        server.id,
        conflict.expected_version,
        conflict.modified_by_label(),
        conflict.current_version,
        server.title,
        server.due_date,
        server.priority,
        if server.is_completed { "completed" } else { "pending" },
        if fields.is_empty() {
            "(none)".to_string()
        } else {
            fields.join(", ")
        },
    )
}

pub fn reminder_to_list_item(reminder: &ScheduledReminder) -> ReminderListItem {
    ReminderListItem {
        notification_id: reminder.id.value(),
        task_id: reminder.payload.task_id.to_string(),
        title: reminder.payload.title.clone(),
        trigger_at: reminder.trigger_at.to_rfc3339(),
        due_date: reminder.payload.due_date.to_string(),
        priority: reminder.payload.priority.to_string(),
    }
}

pub fn format_reminder_lines(reminders: &[ScheduledReminder]) -> Vec<String> {
    reminders
        .iter()
        .map(|reminder| {
            format!(
                "{}  {}  {} (due {}, {})",
                reminder.trigger_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                reminder.payload.task_id,
                reminder.payload.title,
                reminder.payload.due_date,
                reminder.payload.priority,
            )
        })
        .collect()
}
