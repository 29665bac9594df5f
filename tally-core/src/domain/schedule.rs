//! Schedule domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::task::Task;

/// Recurring schedule that re-runs its task every `interval` seconds,
/// starting at `scheduled_at`.
///
/// The trigger ids point at the interval and periodic-job definitions held by
/// the trigger store. They are `None` only for a schedule that has not been
/// attached yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub interval: i64,
    pub interval_schedule_id: Option<i64>,
    pub periodic_job_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskSchedule {
    pub fn new(scheduled_at: DateTime<Utc>, interval: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scheduled_at,
            interval,
            interval_schedule_id: None,
            periodic_job_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A schedule together with the task it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub schedule: TaskSchedule,
    pub task: Task,
}

impl ScheduledTask {
    /// Pairs a schedule with a task, linking the task back to the schedule.
    pub fn new(schedule: TaskSchedule, mut task: Task) -> Self {
        task.schedule_id = Some(schedule.id);
        Self { schedule, task }
    }
}
