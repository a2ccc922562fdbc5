use hearth_core::api::TaskApi;
use hearth_core::config::ClientConfig;
use hearth_core::subscription::normalize_batch;

use crate::commands::common::{api_client, format_task_lines, task_to_list_item, TaskListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let api = api_client(config)?;
    let tasks = normalize_batch(api.list_tasks(&config.owner_id).await?);

    if as_json {
        let json_items = tasks
            .iter()
            .map(task_to_list_item)
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_task_lines(&tasks, &config.owner_id) {
            println!("{line}");
        }
    }

    Ok(())
}
