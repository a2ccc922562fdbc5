use hearth_core::api::{TaskApi, UpdateOutcome};
use hearth_core::config::ClientConfig;

use crate::commands::common::{
    api_client, find_task, format_conflict, normalize_task_identifier, LocalReminders,
};
use crate::error::CliError;

pub async fn run_toggle(id: &str, config: &ClientConfig) -> Result<(), CliError> {
    let id = normalize_task_identifier(id)?;
    let api = api_client(config)?;
    let task = find_task(&api, &config.owner_id, &id).await?;

    let updated = match api.toggle_completion(&task).await? {
        UpdateOutcome::Updated(updated) => updated,
        UpdateOutcome::Conflict(conflict) => {
            return Err(CliError::Conflict(format_conflict(&conflict)));
        }
    };

    let reminders = LocalReminders::open(config).await?;
    let scheduler = reminders.scheduler(config);
    if updated.is_completed {
        scheduler.cancel(&updated.id).await;
        println!("{} completed", updated.id);
    } else {
        scheduler.schedule(&updated).await;
        println!("{} reopened", updated.id);
    }
    Ok(())
}
