use hearth_core::config::ClientConfig;
use hearth_core::reminders::NotificationScheduler;

use crate::commands::common::{
    format_reminder_lines, reminder_to_list_item, LocalReminders, ReminderListItem,
};
use crate::error::CliError;

pub async fn run_reminders(as_json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let reminders = LocalReminders::open(config).await?;
    let scheduled = reminders.queue().list_scheduled().await?;

    if as_json {
        let json_items = scheduled
            .iter()
            .map(reminder_to_list_item)
            .collect::<Vec<ReminderListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if scheduled.is_empty() {
        println!("No reminders scheduled");
    } else {
        for line in format_reminder_lines(&scheduled) {
            println!("{line}");
        }
    }

    Ok(())
}
