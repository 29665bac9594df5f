//! Task-related API endpoints

use crate::TallyClient;
use crate::error::Result;
use tally_core::dto::task::{CreateTask, TaskDetail, TaskSummary};
use uuid::Uuid;

impl TallyClient {
    /// Create a task and dispatch it to the worker pool
    ///
    /// # Arguments
    /// * `req` - The operands to add
    ///
    /// # Returns
    /// The stored task, still `PENDING`
    ///
    /// # Example
    /// ```no_run
    /// # use tally_client::TallyClient;
    /// # use tally_core::dto::task::CreateTask;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = TallyClient::new("http://localhost:8080");
    /// let task = client.create_task(CreateTask { a: 5, b: 6 }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_task(&self, req: CreateTask) -> Result<TaskSummary> {
        let url = format!("{}/tasks", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a task by ID
    ///
    /// # Arguments
    /// * `task_id` - The task UUID
    ///
    /// # Returns
    /// The task with its result history
    pub async fn get_task(&self, task_id: Uuid) -> Result<TaskDetail> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all tasks, newest first
    pub async fn list_tasks(&self) -> Result<Vec<TaskSummary>> {
        let url = format!("{}/tasks", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{TallyClient, test_server};
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode,
        routing::get,
    };
    use tally_core::domain::task::{Task, TaskStatus};
    use tally_core::dto::task::{CreateTask, TaskDetail, TaskSummary};
    use uuid::Uuid;

    fn router() -> Router {
        Router::new()
            .route(
                "/tasks",
                get(|| async {
                    Json(vec![
                        TaskSummary::from(Task::new(1, 2)),
                        TaskSummary::from(Task::new(3, 4)),
                    ])
                })
                .post(|Json(req): Json<CreateTask>| async move {
                    (StatusCode::CREATED, Json(TaskSummary::from(Task::new(req.a, req.b))))
                }),
            )
            .route(
                "/tasks/{id}",
                get(|Path(id): Path<Uuid>| async move {
                    if id.is_nil() {
                        return Err((
                            StatusCode::NOT_FOUND,
                            Json(serde_json::json!({ "error": format!("Task {} not found", id) })),
                        ));
                    }
                    let mut task = Task::new(5, 6);
                    task.id = id;
                    task.mark_succeeded();
                    Ok(Json(TaskDetail::new(task, Vec::new())))
                }),
            )
    }

    #[tokio::test]
    async fn test_create_task() {
        let client = TallyClient::new(test_server::spawn(router()).await);

        let task = client.create_task(CreateTask { a: 5, b: 6 }).await.unwrap();
        assert_eq!(task.a, 5);
        assert_eq!(task.b, 6);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.is_scheduled);
    }

    #[tokio::test]
    async fn test_get_task() {
        let client = TallyClient::new(test_server::spawn(router()).await);
        let id = Uuid::new_v4();

        let detail = client.get_task(id).await.unwrap();
        assert_eq!(detail.task.id, id);
        assert_eq!(detail.task.status, TaskStatus::Success);
        assert!(detail.results.is_empty());
    }

    #[tokio::test]
    async fn test_get_task_not_found() {
        let client = TallyClient::new(test_server::spawn(router()).await);

        let err = client.get_task(Uuid::nil()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_list_tasks() {
        let client = TallyClient::new(test_server::spawn(router()).await);

        let tasks = client.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].a, 3);
    }
}
