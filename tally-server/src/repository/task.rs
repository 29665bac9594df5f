//! Task Repository
//!
//! SQL for the `tasks` table. Functions take any Postgres executor so they can
//! run against the pool or inside a transaction.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use tally_core::domain::task::{Task, TaskStatus, truncate_message};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, schedule_id, a, b, status, failed_message, \
     worker_handle, created_at, updated_at";

/// Insert a task row
pub async fn insert<'e, E>(executor: E, task: &Task) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO tasks (
            id, schedule_id, a, b, status, failed_message,
            worker_handle, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(task.id)
    .bind(task.schedule_id)
    .bind(task.a)
    .bind(task.b)
    .bind(task.status.as_str())
    .bind(&task.failed_message)
    .bind(&task.worker_handle)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Find a task by ID
pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Task>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// List all tasks, newest first
pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Task>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC",
        TASK_COLUMNS
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Set the worker handle of a task
pub async fn update_worker_handle<'e, E>(
    executor: E,
    id: Uuid,
    worker_handle: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET worker_handle = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(worker_handle)
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a task SUCCESS and clear any earlier failure message
pub async fn mark_succeeded<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = $1, failed_message = NULL, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(TaskStatus::Success.as_str())
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a task FAILED
pub async fn mark_failed<'e, E>(executor: E, id: Uuid, message: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = $1, failed_message = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(TaskStatus::Failed.as_str())
    .bind(truncate_message(message))
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the operands of a task
pub async fn update_operands<'e, E>(
    executor: E,
    id: Uuid,
    a: i64,
    b: i64,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET a = $1, b = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(a)
    .bind(b)
    .bind(updated_at)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    schedule_id: Option<Uuid>,
    a: i64,
    b: i64,
    status: String,
    failed_message: Option<String>,
    worker_handle: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let status = row.status.parse::<TaskStatus>().unwrap_or_else(|e| {
            tracing::warn!("Task {} has {}; reading it as PENDING", row.id, e);
            TaskStatus::Pending
        });

        Task {
            id: row.id,
            schedule_id: row.schedule_id,
            a: row.a,
            b: row.b,
            status,
            failed_message: row.failed_message,
            worker_handle: row.worker_handle,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
