//! Schedule DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::schedule::ScheduledTask;
use crate::dto::task::TaskSummary;

/// Request to create a schedule, or to fully replace an existing one
///
/// `scheduledAt` accepts RFC 3339 or a naive timestamp read as UTC.
/// `interval` is in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub a: i64,
    pub b: i64,
    #[serde(alias = "scheduled_at", deserialize_with = "crate::dto::datetime::deserialize")]
    pub scheduled_at: DateTime<Utc>,
    pub interval: i64,
}

/// Schedule representation with its task embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub id: Uuid,
    pub task: TaskSummary,
    pub scheduled_at: DateTime<Utc>,
    pub interval: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduledTask> for ScheduleView {
    fn from(scheduled: ScheduledTask) -> Self {
        let ScheduledTask { schedule, task } = scheduled;
        ScheduleView {
            id: schedule.id,
            task: task.into(),
            scheduled_at: schedule.scheduled_at,
            interval: schedule.interval,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        }
    }
}
