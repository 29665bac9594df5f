//! Task command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use tally_client::TallyClient;
use tally_core::dto::task::{CreateTask, TaskDetail, TaskSummary};

use super::colorize_status;
use crate::id_resolver::resolve_task_id;
use crate::types::IdOrPrefix;

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task adding two integers
    Create {
        /// First operand
        a: i64,
        /// Second operand
        b: i64,
    },
    /// Get task details with its results
    Get {
        /// Task ID or unambiguous prefix
        id: String,
    },
    /// List all tasks
    List,
}

/// Handle task commands
pub async fn handle_task_command(command: TaskCommands, client: &TallyClient) -> Result<()> {
    match command {
        TaskCommands::Create { a, b } => create_task(client, a, b).await,
        TaskCommands::Get { id } => get_task(client, &id).await,
        TaskCommands::List => list_tasks(client).await,
    }
}

async fn create_task(client: &TallyClient, a: i64, b: i64) -> Result<()> {
    let task = client.create_task(CreateTask { a, b }).await?;

    println!("{} Task created", "✓".green());
    print_task_summary(&task);

    Ok(())
}

async fn get_task(client: &TallyClient, id: &str) -> Result<()> {
    let uuid = resolve_task_id(client, &IdOrPrefix::parse(id)).await?;
    let detail = client.get_task(uuid).await?;

    print_task_details(&detail);

    Ok(())
}

async fn list_tasks(client: &TallyClient) -> Result<()> {
    let tasks = client.list_tasks().await?;

    if tasks.is_empty() {
        println!("{}", "No tasks found.".yellow());
    } else {
        println!("{}", format!("Found {} task(s):", tasks.len()).bold());
        println!();
        for task in tasks {
            print_task_summary(&task);
        }
    }

    Ok(())
}

fn print_task_summary(task: &TaskSummary) {
    println!("  {} Task {}", "▸".cyan(), task.id.to_string().dimmed());
    println!("    Operands: {} + {}", task.a, task.b);
    println!("    Status:   {}", colorize_status(task.status));
    if task.is_scheduled {
        println!("    Scheduled: {}", "yes".cyan());
    }
    if let Some(message) = &task.failed_message {
        println!("    Error:    {}", message.red());
    }
    println!(
        "    Created:  {}",
        task.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_task_details(detail: &TaskDetail) {
    let task = &detail.task;

    println!("{}", "Task Details:".bold());
    println!("  ID:        {}", task.id.to_string().cyan());
    println!("  Operands:  {} + {}", task.a, task.b);
    println!("  Status:    {}", colorize_status(task.status));
    println!("  Scheduled: {}", task.is_scheduled);
    if let Some(handle) = &task.worker_handle {
        println!("  Worker:    {}", handle.dimmed());
    }
    println!("  Created:   {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:   {}", task.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(message) = &task.failed_message {
        println!("\n{}", "Error:".bold());
        println!("{}", message.red());
    }

    if detail.results.is_empty() {
        println!("\n{}", "No results yet.".yellow());
    } else {
        println!("\n{}", format!("Results ({}):", detail.results.len()).bold());
        for entry in &detail.results {
            println!(
                "  {} {}",
                entry
                    .created_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .dimmed(),
                entry.result.to_string().green()
            );
        }
    }
}
