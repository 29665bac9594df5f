//! Task DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::task::{Task, TaskResult, TaskStatus};

/// Request to create and dispatch a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub a: i64,
    pub b: i64,
}

/// Task as shown in listings and embedded in schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: Uuid,
    pub a: i64,
    pub b: i64,
    pub is_scheduled: bool,
    pub status: TaskStatus,
    pub failed_message: Option<String>,
    pub worker_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskSummary {
    fn from(task: Task) -> Self {
        TaskSummary {
            id: task.id,
            a: task.a,
            b: task.b,
            is_scheduled: task.is_scheduled(),
            status: task.status,
            failed_message: task.failed_message,
            worker_handle: task.worker_handle,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Single task with its full result history, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskSummary,
    pub results: Vec<ResultEntry>,
}

impl TaskDetail {
    pub fn new(task: Task, results: Vec<TaskResult>) -> Self {
        TaskDetail {
            task: task.into(),
            results: results.into_iter().map(ResultEntry::from).collect(),
        }
    }
}

/// One entry of a task's result history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub result: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TaskResult> for ResultEntry {
    fn from(result: TaskResult) -> Self {
        ResultEntry {
            result: result.result,
            created_at: result.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_camel_case() {
        let summary = TaskSummary::from(Task::new(5, 6));
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["a"], 5);
        assert_eq!(json["b"], 6);
        assert_eq!(json["isScheduled"], false);
        assert_eq!(json["status"], "PENDING");
        assert!(json.get("failedMessage").is_some());
        assert!(json.get("workerHandle").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("results").is_none());
    }

    #[test]
    fn test_detail_flattens_summary_and_lists_results() {
        let task = Task::new(5, 6);
        let results = vec![
            TaskResult {
                result: 11,
                created_at: Utc::now(),
            },
            TaskResult {
                result: 11,
                created_at: Utc::now(),
            },
        ];

        let json = serde_json::to_value(TaskDetail::new(task.clone(), results)).unwrap();

        assert_eq!(json["id"], task.id.to_string());
        assert_eq!(json["results"].as_array().map(|r| r.len()), Some(2));
        assert_eq!(json["results"][0]["result"], 11);
        assert!(json["results"][0].get("createdAt").is_some());
    }
}
