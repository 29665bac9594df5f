//! Repository Module
//!
//! Data access layer for tasks, their result log and their schedules.
//! `TaskStore` is the seam the services work against; `PgTaskStore` backs it
//! with Postgres and `InMemoryTaskStore` keeps everything in process.

pub mod memory;
pub mod postgres;
pub mod result;
pub mod schedule;
pub mod task;

use async_trait::async_trait;
use tally_core::domain::schedule::ScheduledTask;
use tally_core::domain::task::{Task, TaskResult};
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryTaskStore;
pub use postgres::PgTaskStore;

/// Errors raised by a [`TaskStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    #[error("schedule {0} not found")]
    ScheduleNotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for tasks, results and schedules
///
/// Writes that touch more than one record (`record_success`,
/// `create_scheduled_task`, `update_scheduled_task`) are atomic: concurrent
/// readers see either all or none of them.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a pending task with a fresh id.
    async fn create_task(&self, a: i64, b: i64) -> Result<Task>;

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;

    /// All tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Associates the worker handle with the task. Status is left untouched.
    async fn record_dispatch(&self, id: Uuid, worker_handle: &str) -> Result<()>;

    /// Appends a result and marks the task SUCCESS.
    async fn record_success(&self, id: Uuid, value: i64) -> Result<()>;

    /// Marks the task FAILED with the given message.
    async fn record_failure(&self, id: Uuid, message: &str) -> Result<()>;

    /// Result history of a task, newest first.
    async fn list_results(&self, task_id: Uuid) -> Result<Vec<TaskResult>>;

    /// Persists a schedule and its task together.
    async fn create_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()>;

    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduledTask>>;

    /// All schedules with their tasks, newest first.
    async fn list_schedules(&self) -> Result<Vec<ScheduledTask>>;

    /// Replaces the stored schedule and its task's operands.
    async fn update_scheduled_task(&self, scheduled: &ScheduledTask) -> Result<()>;

    /// Deletes a schedule, its task and the task's results.
    /// Returns false when no such schedule exists.
    async fn delete_schedule(&self, id: Uuid) -> Result<bool>;
}
