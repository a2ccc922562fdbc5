use hearth_core::api::TaskApi;
use hearth_core::config::ClientConfig;

use crate::commands::common::{api_client, normalize_task_identifier, LocalReminders};
use crate::error::CliError;

pub async fn run_delete(id: &str, config: &ClientConfig) -> Result<(), CliError> {
    let id = normalize_task_identifier(id)?;
    let api = api_client(config)?;
    api.delete_task(&id).await?;

    let reminders = LocalReminders::open(config).await?;
    reminders.scheduler(config).cancel(&id).await;

    println!("{id}");
    Ok(())
}
