use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hearth_core::models::{Priority, ResolutionStrategy};

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Household tasks from the command line, kept in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Overrides for settings otherwise read from the config file and `HEARTH_*`.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Task API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Household member to act as
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add(AddArgs),
    /// Edit a task, guarded by the version you last saw
    Edit(EditArgs),
    /// Flip a task between pending and completed
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// List your tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow task changes live and deliver due reminders
    Watch,
    /// List scheduled local reminders
    Reminders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    #[arg(required = true)]
    pub title: Vec<String>,
    /// Due date: YYYY-MM-DD, `today`, or `tomorrow`
    #[arg(long, default_value = "today")]
    pub due: String,
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
    /// Assign to another household member
    #[arg(long, value_name = "ID")]
    pub assign: Option<String>,
    /// Reminder time, HH:MM
    #[arg(long, value_name = "HH:MM")]
    pub reminder: Option<String>,
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// Version the edit is based on
    #[arg(long, value_name = "N")]
    pub expected_version: u64,
    #[arg(long)]
    pub title: Option<String>,
    /// New description; pass an empty string to clear it
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
    #[arg(long, value_name = "ID")]
    pub assign: Option<String>,
    /// New reminder time; pass an empty string to clear it
    #[arg(long, value_name = "HH:MM")]
    pub reminder: Option<String>,
    /// Replace categories
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,
    /// How to settle a version conflict. Without it a conflict fails the command.
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictChoice>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictChoice {
    /// Keep the server's version
    Server,
    /// Overwrite with your changes
    Local,
    /// Server version with your changed fields on top
    Merge,
}

impl From<ConflictChoice> for ResolutionStrategy {
    fn from(value: ConflictChoice) -> Self {
        match value {
            ConflictChoice::Server => Self::UseServer,
            ConflictChoice::Local => Self::UseLocal,
            ConflictChoice::Merge => Self::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
