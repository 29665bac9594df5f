//! Postgres-backed [`TriggerStore`]
//!
//! Definitions live in `interval_schedules` and `periodic_jobs`, next to the
//! task tables so the beat and the API share one database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use sqlx::types::Json;

use super::{
    IntervalPeriod, IntervalSchedule, NewPeriodicJob, PeriodicJob, Result, TriggerError,
    TriggerStore,
};

const JOB_COLUMNS: &str = "id, name, unit, args, interval_id, start_time, enabled, \
                           last_run_at, total_run_count, changed_at";

/// Trigger store over a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgTriggerStore {
    pool: PgPool,
}

impl PgTriggerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriggerStore for PgTriggerStore {
    async fn get_or_create_interval(&self, every: i64) -> Result<(IntervalSchedule, bool)> {
        // The no-op update makes the conflicting row come back from RETURNING;
        // xmax is zero only on a freshly inserted row.
        let row = sqlx::query_as::<_, UpsertedIntervalRow>(
            r#"
            INSERT INTO interval_schedules (every, period)
            VALUES ($1, $2)
            ON CONFLICT (every, period) DO UPDATE SET every = EXCLUDED.every
            RETURNING id, every, period, (xmax = 0) AS inserted
            "#,
        )
        .bind(every)
        .bind(IntervalPeriod::Seconds.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok((row.interval.into(), row.inserted))
    }

    async fn find_interval(&self, id: i64) -> Result<Option<IntervalSchedule>> {
        let row = sqlx::query_as::<_, IntervalRow>(
            "SELECT id, every, period FROM interval_schedules WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn retime_interval(&self, id: i64, job_id: i64, every: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE waits for jobs being attached to this interval to commit,
        // so the check below sees them.
        if !lock_interval(&mut tx, id).await? {
            return Err(TriggerError::IntervalNotFound(id));
        }

        let shared: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM periodic_jobs WHERE interval_id = $1 AND id <> $2)",
        )
        .bind(id)
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;
        if shared {
            return Ok(false);
        }

        let updated = sqlx::query("UPDATE interval_schedules SET every = $1 WHERE id = $2")
            .bind(every)
            .bind(id)
            .execute(&mut *tx)
            .await;
        match updated {
            Ok(_) => {}
            Err(sqlx::Error::Database(ref db)) if db.is_unique_violation() => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_unused_interval(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if !lock_interval(&mut tx, id).await? {
            return Ok(false);
        }

        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM periodic_jobs WHERE interval_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if in_use {
            return Ok(false);
        }

        let deleted = sqlx::query("DELETE FROM interval_schedules WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await;
        let result = match deleted {
            Ok(result) => result,
            // ON DELETE RESTRICT: a job still points here.
            Err(sqlx::Error::Database(ref db)) if db.is_foreign_key_violation() => {
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_job(&self, job: NewPeriodicJob) -> Result<PeriodicJob> {
        let sql = format!(
            r#"
            INSERT INTO periodic_jobs (name, unit, args, interval_id, start_time, enabled, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(&job.name)
            .bind(&job.unit)
            .bind(Json(&job.args))
            .bind(job.interval_id)
            .bind(job.start_time)
            .bind(job.enabled)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    TriggerError::DuplicateJobName(job.name.clone())
                }
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    TriggerError::IntervalNotFound(job.interval_id)
                }
                other => TriggerError::Database(other),
            })?;

        Ok(row.into())
    }

    async fn find_job(&self, id: i64) -> Result<Option<PeriodicJob>> {
        let sql = format!("SELECT {} FROM periodic_jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn update_job(&self, job: &PeriodicJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE periodic_jobs
            SET interval_id = $1, args = $2, start_time = $3, enabled = $4, changed_at = $5
            WHERE id = $6
            "#,
        )
        .bind(job.interval_id)
        .bind(Json(&job.args))
        .bind(job.start_time)
        .bind(job.enabled)
        .bind(Utc::now())
        .bind(job.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                TriggerError::IntervalNotFound(job.interval_id)
            }
            other => TriggerError::Database(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(TriggerError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn set_job_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE periodic_jobs SET enabled = $1, changed_at = $2 WHERE id = $3")
                .bind(enabled)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(TriggerError::JobNotFound(id));
        }
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM periodic_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_enabled_jobs(&self) -> Result<Vec<(PeriodicJob, IntervalSchedule)>> {
        let rows = sqlx::query_as::<_, EnabledJobRow>(
            r#"
            SELECT j.id, j.name, j.unit, j.args, j.interval_id, j.start_time, j.enabled,
                   j.last_run_at, j.total_run_count, j.changed_at,
                   i.every, i.period
            FROM periodic_jobs j
            JOIN interval_schedules i ON i.id = j.interval_id
            WHERE j.enabled
            ORDER BY j.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn record_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE periodic_jobs
            SET last_run_at = $1, total_run_count = total_run_count + 1
            WHERE id = $2
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TriggerError::JobNotFound(id));
        }
        Ok(())
    }
}

/// Row-locks an interval definition for the rest of the transaction.
/// Returns false when it does not exist.
async fn lock_interval(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool> {
    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM interval_schedules WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(locked.is_some())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct IntervalRow {
    id: i64,
    every: i64,
    period: String,
}

impl From<IntervalRow> for IntervalSchedule {
    fn from(row: IntervalRow) -> Self {
        IntervalSchedule {
            id: row.id,
            every: row.every,
            period: row.period.parse().unwrap_or(IntervalPeriod::Seconds),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UpsertedIntervalRow {
    #[sqlx(flatten)]
    interval: IntervalRow,
    inserted: bool,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    name: String,
    unit: String,
    args: Json<Vec<serde_json::Value>>,
    interval_id: i64,
    start_time: DateTime<Utc>,
    enabled: bool,
    last_run_at: Option<DateTime<Utc>>,
    total_run_count: i64,
    changed_at: DateTime<Utc>,
}

impl From<JobRow> for PeriodicJob {
    fn from(row: JobRow) -> Self {
        PeriodicJob {
            id: row.id,
            name: row.name,
            unit: row.unit,
            args: row.args.0,
            interval_id: row.interval_id,
            start_time: row.start_time,
            enabled: row.enabled,
            last_run_at: row.last_run_at,
            total_run_count: row.total_run_count,
            changed_at: row.changed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EnabledJobRow {
    #[sqlx(flatten)]
    job: JobRow,
    every: i64,
    period: String,
}

impl From<EnabledJobRow> for (PeriodicJob, IntervalSchedule) {
    fn from(row: EnabledJobRow) -> Self {
        let interval = IntervalSchedule {
            id: row.job.interval_id,
            every: row.every,
            period: row.period.parse().unwrap_or(IntervalPeriod::Seconds),
        };
        (row.job.into(), interval)
    }
}
