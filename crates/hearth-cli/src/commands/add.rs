use hearth_core::api::TaskApi;
use hearth_core::config::ClientConfig;
use hearth_core::models::NewTask;

use crate::cli::AddArgs;
use crate::commands::common::{api_client, join_title, local_today, parse_due_date, LocalReminders};
use crate::error::CliError;

pub async fn run_add(args: AddArgs, config: &ClientConfig) -> Result<(), CliError> {
    let title = join_title(&args.title)?;
    let due_date = parse_due_date(&args.due, local_today())?;

    let mut draft = NewTask::new(title, config.owner_id.clone(), due_date);
    draft.description = args.description;
    draft.reminder_time = args.reminder;
    draft.categories = args.categories;
    if let Some(priority) = args.priority {
        draft.priority = priority.into();
    }
    if let Some(assignee) = args.assign {
        draft.assigned_to = assignee;
    }

    let api = api_client(config)?;
    let task = api.create_task(&draft).await?;

    let reminders = LocalReminders::open(config).await?;
    reminders.scheduler(config).schedule(&task).await;

    println!("{}", task.id);
    Ok(())
}
