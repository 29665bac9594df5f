use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create schedules table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS task_schedules (
            id UUID PRIMARY KEY,
            scheduled_at TIMESTAMPTZ NOT NULL,
            interval_seconds BIGINT NOT NULL CHECK (interval_seconds >= 1),
            interval_schedule_id BIGINT,
            periodic_job_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create tasks table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id UUID PRIMARY KEY,
            schedule_id UUID REFERENCES task_schedules(id) ON DELETE CASCADE,
            a BIGINT NOT NULL,
            b BIGINT NOT NULL,
            status VARCHAR(20) NOT NULL,
            failed_message VARCHAR(255),
            worker_handle VARCHAR(255),
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create results table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS task_results (
            id BIGSERIAL PRIMARY KEY,
            task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            result BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_schedule_id ON tasks(schedule_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_task_results_task_id ON task_results(task_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    // Create trigger definition tables
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interval_schedules (
            id BIGSERIAL PRIMARY KEY,
            every BIGINT NOT NULL,
            period VARCHAR(24) NOT NULL,
            UNIQUE (every, period)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS periodic_jobs (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(200) NOT NULL UNIQUE,
            unit VARCHAR(200) NOT NULL,
            args JSONB NOT NULL DEFAULT '[]',
            interval_id BIGINT NOT NULL REFERENCES interval_schedules(id) ON DELETE RESTRICT,
            start_time TIMESTAMPTZ NOT NULL,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            last_run_at TIMESTAMPTZ,
            total_run_count BIGINT NOT NULL DEFAULT 0,
            changed_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Databases bootstrapped before the constraint became RESTRICT still cascade.
    sqlx::query(
        r#"
        ALTER TABLE periodic_jobs
            DROP CONSTRAINT IF EXISTS periodic_jobs_interval_id_fkey,
            ADD CONSTRAINT periodic_jobs_interval_id_fkey
                FOREIGN KEY (interval_id) REFERENCES interval_schedules(id) ON DELETE RESTRICT
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_periodic_jobs_enabled ON periodic_jobs(enabled)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
