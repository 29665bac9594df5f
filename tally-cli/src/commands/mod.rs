//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod schedule;
mod task;

pub use schedule::ScheduleCommands;
pub use task::TaskCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use tally_client::TallyClient;
use tally_core::domain::task::TaskStatus;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// One-off addition tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Recurring schedules
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Check that the server is reachable
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = TallyClient::new(&config.server_url);

    match command {
        Commands::Task { command } => task::handle_task_command(command, &client).await,
        Commands::Schedule { command } => {
            schedule::handle_schedule_command(command, &client).await
        }
        Commands::Health => {
            client.health().await?;
            println!("{} {}", "✓".green(), client.base_url());
            Ok(())
        }
    }
}

/// Colorize task status for display
pub(crate) fn colorize_status(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => status.as_str().yellow(),
        TaskStatus::Success => status.as_str().green(),
        TaskStatus::Failed => status.as_str().red(),
    }
}
