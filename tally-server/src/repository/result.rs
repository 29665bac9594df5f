//! Result Repository
//!
//! Append-only log of task outcomes (`task_results` table).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use tally_core::domain::task::TaskResult;
use uuid::Uuid;

/// Append a result for a task
pub async fn append<'e, E>(
    executor: E,
    task_id: Uuid,
    value: i64,
    created_at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO task_results (task_id, result, created_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(task_id)
    .bind(value)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get all results of a task, newest first
pub async fn find_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<TaskResult>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT result, created_at
        FROM task_results
        WHERE task_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(task_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ResultRow {
    result: i64,
    created_at: DateTime<Utc>,
}

impl From<ResultRow> for TaskResult {
    fn from(row: ResultRow) -> Self {
        TaskResult {
            result: row.result,
            created_at: row.created_at,
        }
    }
}
