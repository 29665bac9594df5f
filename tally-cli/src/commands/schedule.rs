//! Schedule command handlers

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::*;
use tally_client::TallyClient;
use tally_core::dto::datetime::parse_timestamp;
use tally_core::dto::schedule::{ScheduleRequest, ScheduleView};

use super::colorize_status;
use crate::id_resolver::resolve_schedule_id;
use crate::types::IdOrPrefix;

/// Schedule subcommands
#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Create a recurring schedule
    Create {
        /// First operand
        a: i64,
        /// Second operand
        b: i64,
        /// First run, RFC 3339 or naive UTC (e.g. 2022-02-22T14:14:14)
        #[arg(long, value_parser = parse_timestamp)]
        at: DateTime<Utc>,
        /// Interval in seconds
        #[arg(long)]
        every: i64,
    },
    /// List all schedules
    List,
    /// Get schedule details
    Get {
        /// Schedule ID or unambiguous prefix
        id: String,
    },
    /// Replace the operands and timing of a schedule
    Update {
        /// Schedule ID or unambiguous prefix
        id: String,
        /// First operand
        a: i64,
        /// Second operand
        b: i64,
        /// First run, RFC 3339 or naive UTC
        #[arg(long, value_parser = parse_timestamp)]
        at: DateTime<Utc>,
        /// Interval in seconds
        #[arg(long)]
        every: i64,
    },
    /// Delete a schedule and its task
    Delete {
        /// Schedule ID or unambiguous prefix
        id: String,
    },
}

/// Handle schedule commands
pub async fn handle_schedule_command(
    command: ScheduleCommands,
    client: &TallyClient,
) -> Result<()> {
    match command {
        ScheduleCommands::Create { a, b, at, every } => {
            let schedule = client.create_schedule(request(a, b, at, every)).await?;
            println!("{} Schedule created", "✓".green());
            print_schedule(&schedule);
            Ok(())
        }
        ScheduleCommands::List => list_schedules(client).await,
        ScheduleCommands::Get { id } => {
            let uuid = resolve_schedule_id(client, &IdOrPrefix::parse(&id)).await?;
            print_schedule(&client.get_schedule(uuid).await?);
            Ok(())
        }
        ScheduleCommands::Update {
            id,
            a,
            b,
            at,
            every,
        } => {
            let uuid = resolve_schedule_id(client, &IdOrPrefix::parse(&id)).await?;
            let schedule = client.update_schedule(uuid, request(a, b, at, every)).await?;
            println!("{} Schedule updated", "✓".green());
            print_schedule(&schedule);
            Ok(())
        }
        ScheduleCommands::Delete { id } => {
            let uuid = resolve_schedule_id(client, &IdOrPrefix::parse(&id)).await?;
            client.delete_schedule(uuid).await?;
            println!("{} Schedule {} deleted", "✓".green(), uuid);
            Ok(())
        }
    }
}

fn request(a: i64, b: i64, scheduled_at: DateTime<Utc>, interval: i64) -> ScheduleRequest {
    ScheduleRequest {
        a,
        b,
        scheduled_at,
        interval,
    }
}

async fn list_schedules(client: &TallyClient) -> Result<()> {
    let schedules = client.list_schedules().await?;

    if schedules.is_empty() {
        println!("{}", "No schedules found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} schedule(s):", schedules.len()).bold()
        );
        println!();
        for schedule in schedules {
            print_schedule(&schedule);
        }
    }

    Ok(())
}

fn print_schedule(schedule: &ScheduleView) {
    println!("  {} Schedule {}", "▸".cyan(), schedule.id.to_string().dimmed());
    println!("    Operands: {} + {}", schedule.task.a, schedule.task.b);
    println!(
        "    Every:    {}s from {}",
        schedule.interval,
        schedule.scheduled_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("    Task:     {}", schedule.task.id.to_string().dimmed());
    println!("    Status:   {}", colorize_status(schedule.task.status));
    println!();
}
