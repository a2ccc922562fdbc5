//! Hearth CLI - household tasks from the terminal
//!
//! Writes go straight to the task API with optimistic concurrency; reminders
//! are kept in a local database and delivered by `hearth watch`.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_config;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::reminders::run_reminders;
use crate::commands::toggle::run_toggle;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hearth=info".parse().expect("static directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = resolve_config(&cli.connection)?;
    tracing::debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Add(args) => run_add(args, &config).await?,
        Commands::Edit(args) => run_edit(args, &config).await?,
        Commands::Toggle { id } => run_toggle(&id, &config).await?,
        Commands::Delete { id } => run_delete(&id, &config).await?,
        Commands::List { json } => run_list(json, &config).await?,
        Commands::Watch => run_watch(&config).await?,
        Commands::Reminders { json } => run_reminders(json, &config).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
