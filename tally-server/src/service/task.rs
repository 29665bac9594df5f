//! Task Service
//!
//! Business logic for creating, dispatching and reading tasks.

use std::sync::Arc;
use tally_core::domain::task::Task;
use tally_core::dto::task::{CreateTask, TaskDetail, TaskSummary};
use thiserror::Error;
use uuid::Uuid;

use crate::queue::{QueueError, WorkQueue};
use crate::repository::{StoreError, TaskStore};
use crate::trigger::ADD_UNIT;
use crate::worker::add_args;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("failed to dispatch task {id}: {source}")]
    Dispatch {
        id: Uuid,
        #[source]
        source: QueueError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn WorkQueue>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Creates a pending task and hands it to the worker.
    ///
    /// The returned task is still PENDING; the outcome is recorded later by
    /// the `add` unit. When the queue refuses the submission the task is
    /// stored as FAILED and the error is returned.
    pub async fn create_task(&self, req: CreateTask) -> Result<Task, TaskError> {
        let mut task = self.store.create_task(req.a, req.b).await?;
        tracing::info!("Task created: {}", task.id);

        match self.queue.submit(ADD_UNIT, add_args(&task)).await {
            Ok(handle) => {
                self.store.record_dispatch(task.id, &handle).await?;
                tracing::debug!("Task {} dispatched as {}", task.id, handle);
                task.worker_handle = Some(handle);
                Ok(task)
            }
            Err(e) => {
                tracing::error!("Failed to dispatch task {}: {}", task.id, e);
                self.store.record_failure(task.id, &e.to_string()).await?;
                Err(TaskError::Dispatch {
                    id: task.id,
                    source: e,
                })
            }
        }
    }

    /// Get a task with its result history
    pub async fn get_task(&self, id: Uuid) -> Result<TaskDetail, TaskError> {
        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or(TaskError::NotFound(id))?;
        let results = self.store.list_results(id).await?;

        Ok(TaskDetail::new(task, results))
    }

    /// List all tasks, newest first
    pub async fn list_tasks(&self) -> Result<Vec<TaskSummary>, TaskError> {
        let tasks = self.store.list_tasks().await?;
        Ok(tasks.into_iter().map(TaskSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::LocalQueue;
    use crate::repository::InMemoryTaskStore;
    use tally_core::domain::task::TaskStatus;

    #[tokio::test]
    async fn test_create_task_dispatches_add() {
        let store = Arc::new(InMemoryTaskStore::new());
        let (queue, mut receiver) = LocalQueue::new(4);
        let service = TaskService::new(store.clone(), Arc::new(queue));

        let task = service.create_task(CreateTask { a: 5, b: 6 }).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let item = receiver.recv().await.unwrap();
        assert_eq!(item.unit, ADD_UNIT);
        assert_eq!(item.args, add_args(&task));
        assert_eq!(task.worker_handle.as_deref(), Some(item.handle.as_str()));

        let stored = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.worker_handle, task.worker_handle);
    }

    #[tokio::test]
    async fn test_create_task_marks_failed_when_queue_rejects() {
        let store = Arc::new(InMemoryTaskStore::new());
        let (queue, receiver) = LocalQueue::new(1);
        drop(receiver);
        let service = TaskService::new(store.clone(), Arc::new(queue));

        let result = service.create_task(CreateTask { a: 1, b: 2 }).await;
        let Err(TaskError::Dispatch { id, .. }) = result else {
            panic!("expected dispatch error");
        };

        let stored = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.failed_message.as_deref(), Some("work queue is closed"));
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let (queue, _receiver) = LocalQueue::new(1);
        let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), Arc::new(queue));

        let result = service.get_task(Uuid::new_v4()).await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_task_includes_results() {
        let store = Arc::new(InMemoryTaskStore::new());
        let (queue, _receiver) = LocalQueue::new(4);
        let service = TaskService::new(store.clone(), Arc::new(queue));

        let task = service.create_task(CreateTask { a: 5, b: 6 }).await.unwrap();
        store.record_success(task.id, 11).await.unwrap();

        let detail = service.get_task(task.id).await.unwrap();
        assert_eq!(detail.task.status, TaskStatus::Success);
        assert_eq!(detail.results.len(), 1);
        assert_eq!(detail.results[0].result, 11);
    }
}
