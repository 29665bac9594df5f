//! Postgres-backed [`TaskStore`]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tally_core::domain::schedule::ScheduledTask;
use tally_core::domain::task::{Task, TaskResult};
use uuid::Uuid;

use super::{Result, StoreError, TaskStore};
use crate::repository::{
    result as result_repository, schedule as schedule_repository, task as task_repository,
};

/// Task store over a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_task(&self, a: i64, b: i64) -> Result<Task> {
        let task = Task::new(a, b);
        task_repository::insert(&self.pool, &task).await?;
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(task_repository::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(task_repository::list_all(&self.pool).await?)
    }

    async fn record_dispatch(&self, id: Uuid, worker_handle: &str) -> Result<()> {
        if !task_repository::update_worker_handle(&self.pool, id, worker_handle).await? {
            return Err(StoreError::TaskNotFound(id));
        }
        Ok(())
    }

    async fn record_success(&self, id: Uuid, value: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Status first so an unknown id fails before anything is appended.
        if !task_repository::mark_succeeded(&mut *tx, id).await? {
            return Err(StoreError::TaskNotFound(id));
        }
        result_repository::append(&mut *tx, id, value, Utc::now()).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, message: &str) -> Result<()> {
        if !task_repository::mark_failed(&self.pool, id, message).await? {
            return Err(StoreError::TaskNotFound(id));
        }
        Ok(())
    }

    async fn list_results(&self, task_id: Uuid) -> Result<Vec<TaskResult>> {
        Ok(result_repository::find_by_task(&self.pool, task_id).await?)
    }

    async fn create_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        schedule_repository::insert(&mut *tx, &scheduled.schedule).await?;
        task_repository::insert(&mut *tx, &scheduled.task).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduledTask>> {
        Ok(schedule_repository::find_by_id(&self.pool, id).await?)
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduledTask>> {
        Ok(schedule_repository::list_all(&self.pool).await?)
    }

    async fn update_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()> {
        let ScheduledTask { schedule, task } = scheduled;
        let mut tx = self.pool.begin().await?;

        if !schedule_repository::update(&mut *tx, schedule).await? {
            return Err(StoreError::ScheduleNotFound(schedule.id));
        }
        if !task_repository::update_operands(&mut *tx, task.id, task.a, task.b, task.updated_at)
            .await?
        {
            return Err(StoreError::TaskNotFound(task.id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_schedule(&self, id: Uuid) -> Result<bool> {
        Ok(schedule_repository::delete(&self.pool, id).await?)
    }
}
