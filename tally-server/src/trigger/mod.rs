//! Trigger Store
//!
//! Persistent definitions driving recurring execution: interval definitions
//! (a cadence in seconds) and periodic-job definitions (what to run, with which
//! arguments, from when, at which interval). The beat reads them; the schedule
//! manager keeps them in sync with schedules.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryTriggerStore;
pub use postgres::PgTriggerStore;

/// Unit of work fired by schedule-owned job definitions
pub const ADD_UNIT: &str = "add";

/// Deterministic job-definition name for a scheduled task
pub fn scheduled_job_name(task_id: Uuid) -> String {
    format!("task-{}-scheduled", task_id)
}

/// Errors raised by a [`TriggerStore`]
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("interval definition {0} not found")]
    IntervalNotFound(i64),

    #[error("job definition {0} not found")]
    JobNotFound(i64),

    /// The interval was removed or retimed by a concurrent change.
    #[error("interval definition {0} changed concurrently")]
    IntervalChanged(i64),

    #[error("job definition named '{0}' already exists")]
    DuplicateJobName(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("trigger store error: {0}")]
    Internal(String),
}

impl TriggerError {
    /// Whether the operation lost a race on an interval definition and may
    /// succeed when retried.
    pub fn is_interval_race(&self) -> bool {
        matches!(
            self,
            TriggerError::IntervalNotFound(_) | TriggerError::IntervalChanged(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TriggerError>;

/// Unit of an interval definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalPeriod {
    Seconds,
}

impl IntervalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalPeriod::Seconds => "seconds",
        }
    }
}

impl std::str::FromStr for IntervalPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(IntervalPeriod::Seconds),
            other => Err(format!("unknown interval period: {}", other)),
        }
    }
}

/// A firing cadence. At most one definition exists per `(every, period)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSchedule {
    pub id: i64,
    pub every: i64,
    pub period: IntervalPeriod,
}

impl IntervalSchedule {
    pub fn as_duration(&self) -> chrono::Duration {
        match self.period {
            IntervalPeriod::Seconds => chrono::Duration::seconds(self.every),
        }
    }
}

/// A recurring job: fires `unit` with `args` every interval from `start_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicJob {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub args: Vec<serde_json::Value>,
    pub interval_id: i64,
    pub start_time: DateTime<Utc>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_run_count: i64,
    pub changed_at: DateTime<Utc>,
}

/// Fields needed to create a [`PeriodicJob`]
#[derive(Debug, Clone)]
pub struct NewPeriodicJob {
    pub name: String,
    pub unit: String,
    pub args: Vec<serde_json::Value>,
    pub interval_id: i64,
    pub start_time: DateTime<Utc>,
    pub enabled: bool,
}

/// Storage for interval and periodic-job definitions
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Returns the interval definition for `every` seconds, creating it if
    /// needed. The flag is true when a new definition was created.
    async fn get_or_create_interval(&self, every: i64) -> Result<(IntervalSchedule, bool)>;

    async fn find_interval(&self, id: i64) -> Result<Option<IntervalSchedule>>;

    /// Changes the cadence of an interval definition in place, provided no
    /// job other than `job_id` uses it and no other definition already has
    /// that cadence. Returns false when the definition was left untouched.
    async fn retime_interval(&self, id: i64, job_id: i64, every: i64) -> Result<bool>;

    /// Deletes an interval definition that no job references. Returns false
    /// when it does not exist or is still in use.
    async fn delete_unused_interval(&self, id: i64) -> Result<bool>;

    /// Creates a job definition. Names are unique.
    async fn create_job(&self, job: NewPeriodicJob) -> Result<PeriodicJob>;

    async fn find_job(&self, id: i64) -> Result<Option<PeriodicJob>>;

    /// Saves interval, arguments, start time and enabled flag of a job.
    async fn update_job(&self, job: &PeriodicJob) -> Result<()>;

    async fn set_job_enabled(&self, id: i64, enabled: bool) -> Result<()>;

    /// Deletes a job definition. Returns false when it did not exist.
    async fn delete_job(&self, id: i64) -> Result<bool>;

    /// Enabled job definitions paired with their interval.
    async fn list_enabled_jobs(&self) -> Result<Vec<(PeriodicJob, IntervalSchedule)>>;

    /// Records that a job fired at `at`.
    async fn record_run(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}
