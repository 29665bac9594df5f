//! Schedule Repository
//!
//! SQL for the `task_schedules` table. Reads join the owned task so a
//! schedule is always returned together with it.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use tally_core::domain::schedule::{ScheduledTask, TaskSchedule};
use tally_core::domain::task::{Task, TaskStatus};
use uuid::Uuid;

const SELECT_SCHEDULED_TASK: &str = r#"
    SELECT s.id AS s_id, s.scheduled_at, s.interval_seconds,
           s.interval_schedule_id, s.periodic_job_id,
           s.created_at AS s_created_at, s.updated_at AS s_updated_at,
           t.id AS t_id, t.a, t.b, t.status, t.failed_message, t.worker_handle,
           t.created_at AS t_created_at, t.updated_at AS t_updated_at
    FROM task_schedules s
    JOIN tasks t ON t.schedule_id = s.id
"#;

/// Insert a schedule row
pub async fn insert<'e, E>(executor: E, schedule: &TaskSchedule) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO task_schedules (
            id, scheduled_at, interval_seconds, interval_schedule_id,
            periodic_job_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(schedule.id)
    .bind(schedule.scheduled_at)
    .bind(schedule.interval)
    .bind(schedule.interval_schedule_id)
    .bind(schedule.periodic_job_id)
    .bind(schedule.created_at)
    .bind(schedule.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Find a schedule and its task by schedule ID
pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<ScheduledTask>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("{} WHERE s.id = $1", SELECT_SCHEDULED_TASK);
    let row = sqlx::query_as::<_, ScheduledTaskRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// List all schedules, newest first
pub async fn list_all<'e, E>(executor: E) -> Result<Vec<ScheduledTask>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "{} ORDER BY s.created_at DESC, s.id DESC",
        SELECT_SCHEDULED_TASK
    );
    let rows = sqlx::query_as::<_, ScheduledTaskRow>(&sql)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Update a schedule's timing and trigger references
pub async fn update<'e, E>(executor: E, schedule: &TaskSchedule) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE task_schedules
        SET scheduled_at = $1, interval_seconds = $2, interval_schedule_id = $3,
            periodic_job_id = $4, updated_at = $5
        WHERE id = $6
        "#,
    )
    .bind(schedule.scheduled_at)
    .bind(schedule.interval)
    .bind(schedule.interval_schedule_id)
    .bind(schedule.periodic_job_id)
    .bind(schedule.updated_at)
    .bind(schedule.id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a schedule by ID. Its task and results go with it.
pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM task_schedules WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ScheduledTaskRow {
    s_id: Uuid,
    scheduled_at: DateTime<Utc>,
    interval_seconds: i64,
    interval_schedule_id: Option<i64>,
    periodic_job_id: Option<i64>,
    s_created_at: DateTime<Utc>,
    s_updated_at: DateTime<Utc>,
    t_id: Uuid,
    a: i64,
    b: i64,
    status: String,
    failed_message: Option<String>,
    worker_handle: Option<String>,
    t_created_at: DateTime<Utc>,
    t_updated_at: DateTime<Utc>,
}

impl From<ScheduledTaskRow> for ScheduledTask {
    fn from(row: ScheduledTaskRow) -> Self {
        let status = row.status.parse::<TaskStatus>().unwrap_or_else(|e| {
            tracing::warn!("Task {} has {}; reading it as PENDING", row.t_id, e);
            TaskStatus::Pending
        });

        ScheduledTask {
            schedule: TaskSchedule {
                id: row.s_id,
                scheduled_at: row.scheduled_at,
                interval: row.interval_seconds,
                interval_schedule_id: row.interval_schedule_id,
                periodic_job_id: row.periodic_job_id,
                created_at: row.s_created_at,
                updated_at: row.s_updated_at,
            },
            task: Task {
                id: row.t_id,
                schedule_id: Some(row.s_id),
                a: row.a,
                b: row.b,
                status,
                failed_message: row.failed_message,
                worker_handle: row.worker_handle,
                created_at: row.t_created_at,
                updated_at: row.t_updated_at,
            },
        }
    }
}
