//! Task domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest failure message kept on a task. Longer messages are truncated.
pub const MAX_FAILED_MESSAGE_LEN: usize = 255;

/// A unit of work: two operands to be summed by a worker.
///
/// Structure shared between the server (persists and mutates) and the client
/// (reads through the API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub a: i64,
    pub b: i64,
    pub status: TaskStatus,
    pub failed_message: Option<String>,
    pub worker_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a fresh pending task with a newly allocated id.
    pub fn new(a: i64, b: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            schedule_id: None,
            a,
            b,
            status: TaskStatus::Pending,
            failed_message: None,
            worker_handle: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a recurring schedule owns this task.
    pub fn is_scheduled(&self) -> bool {
        self.schedule_id.is_some()
    }

    /// Marks the task as succeeded. Clears any failure left by an earlier run.
    pub fn mark_succeeded(&mut self) {
        self.status = TaskStatus::Success;
        self.failed_message = None;
        self.updated_at = Utc::now();
    }

    /// Marks the task as failed with the given message.
    pub fn mark_failed(&mut self, message: &str) {
        self.status = TaskStatus::Failed;
        self.failed_message = Some(truncate_message(message));
        self.updated_at = Utc::now();
    }
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// One recorded outcome of a task. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub result: i64,
    pub created_at: DateTime<Utc>,
}

/// Cuts a failure message down to [`MAX_FAILED_MESSAGE_LEN`] characters.
pub fn truncate_message(message: &str) -> String {
    message.chars().take(MAX_FAILED_MESSAGE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new(1, 2);
        assert_eq!(task.a, 1);
        assert_eq!(task.b, 2);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.failed_message.is_none());
        assert!(task.worker_handle.is_none());
        assert!(!task.is_scheduled());
    }

    #[test]
    fn test_success_clears_previous_failure() {
        let mut task = Task::new(1, 2);
        task.mark_failed("boom");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failed_message.as_deref(), Some("boom"));

        task.mark_succeeded();
        assert_eq!(task.status, TaskStatus::Success);
        assert!(task.failed_message.is_none());
    }

    #[test]
    fn test_failed_message_is_truncated() {
        let mut task = Task::new(1, 2);
        task.mark_failed(&"x".repeat(1000));
        assert_eq!(
            task.failed_message.map(|m| m.chars().count()),
            Some(MAX_FAILED_MESSAGE_LEN)
        );
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [TaskStatus::Pending, TaskStatus::Success, TaskStatus::Failed] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!("Queued".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&TaskStatus::Success).unwrap();
        assert_eq!(json, "\"SUCCESS\"");
    }
}
