use chrono::NaiveDate;
use clap::Parser;
use hearth_core::models::{
    ConflictDescriptor, Priority, ResolutionStrategy, Task, TaskId, TaskPatch,
};
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands, CompletionShell, ConflictChoice};
use crate::commands::common::{format_conflict, format_task_line, join_title, parse_due_date};
use crate::commands::completions::render_completions;
use crate::commands::edit::build_patch;
use crate::commands::watch::{probe_address, state_message};
use crate::error::CliError;

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

fn task(id: &str) -> Task {
    let created = chrono::DateTime::parse_from_rfc3339("2030-01-01T08:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    Task {
        id: TaskId::new(id),
        title: "Water plants".to_string(),
        description: None,
        assigned_to: "bob".to_string(),
        created_by: "alice".to_string(),
        due_date: date("2030-06-01"),
        priority: Priority::High,
        is_completed: false,
        categories: vec!["garden".to_string()],
        version: 4,
        last_modified_by: Some("bob".to_string()),
        reminder_time: None,
        created_at: created,
        updated_at: created,
    }
}

#[test]
fn parse_due_date_accepts_keywords_and_iso_dates() {
    let today = date("2030-02-28");
    assert_eq!(parse_due_date("today", today).unwrap(), today);
    assert_eq!(parse_due_date(" Tomorrow ", today).unwrap(), date("2030-03-01"));
    assert_eq!(parse_due_date("2030-12-24", today).unwrap(), date("2030-12-24"));
    assert!(matches!(
        parse_due_date("next week", today),
        Err(CliError::InvalidDate(_))
    ));
}

#[test]
fn join_title_rejects_blank_input() {
    assert_eq!(
        join_title(&["Take".to_string(), "out".to_string(), "trash".to_string()]).unwrap(),
        "Take out trash"
    );
    assert!(matches!(join_title(&[" ".to_string()]), Err(CliError::EmptyTitle)));
}

#[test]
fn edit_flags_build_a_versionless_patch() {
    let cli = Cli::try_parse_from([
        "hearth",
        "edit",
        "t1",
        "--expected-version",
        "3",
        "--priority",
        "low",
        "--reminder",
        "",
        "--category",
        "kitchen",
    ])
    .unwrap();
    let Commands::Edit(args) = cli.command else {
        panic!("expected edit command");
    };
    assert_eq!(args.expected_version, 3);
    assert_eq!(args.on_conflict, None);

    let patch = build_patch(&args).unwrap();
    assert_eq!(
        patch,
        TaskPatch {
            priority: Some(Priority::Low),
            reminder_time: Some(None),
            categories: Some(vec!["kitchen".to_string()]),
            ..TaskPatch::default()
        }
    );
}

#[test]
fn conflict_choice_maps_to_strategy() {
    assert_eq!(
        ResolutionStrategy::from(ConflictChoice::Merge),
        ResolutionStrategy::Merge
    );
    assert_eq!(
        ResolutionStrategy::from(ConflictChoice::Server),
        ResolutionStrategy::UseServer
    );
    let cli = Cli::try_parse_from([
        "hearth",
        "edit",
        "t1",
        "--expected-version",
        "1",
        "--on-conflict",
        "local",
    ])
    .unwrap();
    let Commands::Edit(args) = cli.command else {
        panic!("expected edit command");
    };
    assert_eq!(args.on_conflict, Some(ConflictChoice::Local));
}

#[test]
fn edit_requires_expected_version() {
    assert!(Cli::try_parse_from(["hearth", "edit", "t1", "--title", "x"]).is_err());
}

#[test]
fn task_line_marks_assignee_and_categories() {
    let line = format_task_line(&task("abc"), "alice");
    assert_eq!(line, "abc  [ ] 2030-06-01 High   Water plants (v4) @bob #garden");
}

#[test]
fn conflict_message_names_both_versions() {
    let descriptor = ConflictDescriptor {
        current_version: 4,
        expected_version: 3,
        last_modified_by: Some("bob".to_string()),
        last_modified_by_name: Some("Bob".to_string()),
        server_task: task("abc"),
        local_task: None,
        local_changes: TaskPatch {
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        },
    };
    let message = format_conflict(&descriptor);
    assert!(message.contains("you edited v3, but Bob saved v4"));
    assert!(message.contains("Your changes: priority"));
}

#[test]
fn probe_address_uses_scheme_default_port() {
    assert_eq!(
        probe_address("https://api.example.com"),
        Some(("api.example.com".to_string(), 443))
    );
    assert_eq!(
        probe_address("http://localhost:8787/base"),
        Some(("localhost".to_string(), 8787))
    );
    assert_eq!(probe_address("not a url"), None);
}

#[test]
fn state_messages_are_human_readable() {
    assert_eq!(state_message(hearth_core::SyncState::Synced), "up to date");
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("hearth"));
}
