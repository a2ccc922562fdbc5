use hearth_core::conflict::{EditSession, EditState};
use hearth_core::config::ClientConfig;
use hearth_core::models::{Task, TaskPatch};

use crate::cli::EditArgs;
use crate::commands::common::{
    api_client, find_task, format_conflict, local_today, normalize_task_identifier,
    parse_due_date, LocalReminders,
};
use crate::error::CliError;

pub async fn run_edit(args: EditArgs, config: &ClientConfig) -> Result<(), CliError> {
    let id = normalize_task_identifier(&args.id)?;
    let patch = build_patch(&args)?;
    if patch.is_empty() {
        return Err(CliError::NoChanges);
    }

    let api = api_client(config)?;
    let mut base = find_task(&api, &config.owner_id, &id).await?;
    // The edit is based on the version the user saw, not the one just fetched.
    base.version = args.expected_version;

    let mut session = EditSession::new(base);
    session.edit(&patch)?;
    session.submit(&api).await?;

    if let EditState::ConflictDetected(conflict) = session.state() {
        let message = format_conflict(conflict);
        let Some(choice) = args.on_conflict else {
            return Err(CliError::Conflict(message));
        };
        eprintln!("{message}");
        session.resolve(choice.into())?;
        session.submit(&api).await?;
    }

    match session.state() {
        EditState::Succeeded(task) => {
            finish(task, config).await?;
            Ok(())
        }
        EditState::ConflictDetected(conflict) => Err(CliError::Conflict(format_conflict(conflict))),
        EditState::Failed(error) => Err(CliError::Api(error.clone())),
        other => Err(CliError::Core(hearth_core::Error::InvalidInput(format!(
            "edit ended in unexpected state: {}",
            other.label()
        )))),
    }
}

async fn finish(task: &Task, config: &ClientConfig) -> Result<(), CliError> {
    let reminders = LocalReminders::open(config).await?;
    let scheduler = reminders.scheduler(config);
    if task.is_completed {
        scheduler.cancel(&task.id).await;
    } else {
        scheduler.schedule(task).await;
    }
    println!("{} v{}", task.id, task.version);
    Ok(())
}

pub fn build_patch(args: &EditArgs) -> Result<TaskPatch, CliError> {
    let due_date = args
        .due
        .as_deref()
        .map(|raw| parse_due_date(raw, local_today()))
        .transpose()?;

    Ok(TaskPatch {
        title: args.title.clone(),
        description: args.description.clone().map(clearable),
        assigned_to: args.assign.clone(),
        due_date,
        priority: args.priority.map(Into::into),
        is_completed: None,
        categories: (!args.categories.is_empty()).then(|| args.categories.clone()),
        reminder_time: args.reminder.clone().map(clearable),
        version: None,
    })
}

/// An empty flag value clears the field.
fn clearable(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
