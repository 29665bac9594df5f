//! The `add` unit of work
//!
//! Invoked with `[task_id, a, b]`. Records the sum on the task, or marks the
//! task FAILED with the error when anything goes wrong. Never retried.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tally_core::domain::task::Task;
use uuid::Uuid;

use super::UnitOfWork;
use crate::repository::TaskStore;
use crate::trigger::ADD_UNIT;

pub struct AddUnit {
    store: Arc<dyn TaskStore>,
}

impl AddUnit {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    async fn execute(&self, task_id: Uuid, handle: &str, args: &[serde_json::Value]) -> Result<i64> {
        self.store
            .record_dispatch(task_id, handle)
            .await
            .with_context(|| format!("Failed to record handle for task {}", task_id))?;

        let (a, b) = parse_operands(args)?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| anyhow!("integer overflow adding {} and {}", a, b))?;

        self.store
            .record_success(task_id, sum)
            .await
            .with_context(|| format!("Failed to record result for task {}", task_id))?;

        Ok(sum)
    }
}

#[async_trait]
impl UnitOfWork for AddUnit {
    fn name(&self) -> &'static str {
        ADD_UNIT
    }

    async fn run(&self, handle: &str, args: &[serde_json::Value]) -> Result<()> {
        let task_id = parse_task_id(args)?;

        match self.execute(task_id, handle, args).await {
            Ok(sum) => {
                tracing::info!("Task {} succeeded with result {}", task_id, sum);
                Ok(())
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if let Err(record_err) = self.store.record_failure(task_id, &message).await {
                    tracing::warn!(
                        "Could not mark task {} as failed: {}",
                        task_id,
                        record_err
                    );
                }
                Err(e)
            }
        }
    }
}

/// Arguments `add` expects for `task`
pub fn add_args(task: &Task) -> Vec<serde_json::Value> {
    vec![json!(task.id.to_string()), json!(task.a), json!(task.b)]
}

fn parse_task_id(args: &[serde_json::Value]) -> Result<Uuid> {
    let raw = args
        .first()
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing task id argument"))?;

    Uuid::parse_str(raw).with_context(|| format!("invalid task id '{}'", raw))
}

fn parse_operands(args: &[serde_json::Value]) -> Result<(i64, i64)> {
    match args {
        [_, a, b] => {
            let a = a.as_i64().ok_or_else(|| anyhow!("operand a is not an integer: {}", a))?;
            let b = b.as_i64().ok_or_else(|| anyhow!("operand b is not an integer: {}", b))?;
            Ok((a, b))
        }
        _ => Err(anyhow!("expected 3 arguments, got {}", args.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTaskStore;
    use tally_core::domain::task::TaskStatus;

    fn unit() -> (AddUnit, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        (AddUnit::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_add_records_result() {
        let (unit, store) = unit();
        let task = store.create_task(5, 6).await.unwrap();

        unit.run("h-1", &[json!(task.id.to_string()), json!(5), json!(6)])
            .await
            .unwrap();

        let stored = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Success);
        assert_eq!(stored.worker_handle.as_deref(), Some("h-1"));
        let results = store.list_results(task.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result, 11);
    }

    #[test]
    fn test_add_args_shape() {
        let task = Task::new(3, 4);
        assert_eq!(
            add_args(&task),
            vec![json!(task.id.to_string()), json!(3), json!(4)]
        );
    }

    #[tokio::test]
    async fn test_repeated_runs_append_results() {
        let (unit, store) = unit();
        let task = store.create_task(1, 2).await.unwrap();
        let args = add_args(&task);

        unit.run("h-1", &args).await.unwrap();
        unit.run("h-2", &args).await.unwrap();

        assert_eq!(store.list_results(task.id).await.unwrap().len(), 2);
        let stored = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.worker_handle.as_deref(), Some("h-2"));
    }

    #[tokio::test]
    async fn test_overflow_marks_task_failed() {
        let (unit, store) = unit();
        let task = store.create_task(i64::MAX, 1).await.unwrap();

        let result = unit
            .run("h-1", &[json!(task.id.to_string()), json!(i64::MAX), json!(1)])
            .await;
        assert!(result.is_err());

        let stored = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert!(stored.failed_message.unwrap().contains("integer overflow"));
        assert!(store.list_results(task.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_operand_marks_task_failed() {
        let (unit, store) = unit();
        let task = store.create_task(1, 2).await.unwrap();

        let result = unit
            .run("h-1", &[json!(task.id.to_string()), json!("one"), json!(2)])
            .await;
        assert!(result.is_err());

        let stored = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_task_is_an_error() {
        let (unit, _store) = unit();
        let result = unit
            .run("h-1", &[json!(Uuid::new_v4().to_string()), json!(1), json!(2)])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_task_id_is_an_error() {
        let (unit, _store) = unit();
        assert!(unit.run("h-1", &[]).await.is_err());
        assert!(unit.run("h-1", &[json!("not-a-uuid")]).await.is_err());
    }
}
