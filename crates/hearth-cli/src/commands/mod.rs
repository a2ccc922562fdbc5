pub mod add;
pub mod common;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod list;
pub mod reminders;
pub mod toggle;
pub mod watch;
