//! Task API Handlers
//!
//! HTTP endpoints to create, dispatch and read tasks.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tally_core::dto::task::{CreateTask, TaskDetail, TaskSummary};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /tasks
/// Create a task and dispatch it to the worker
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskSummary>)> {
    let Json(req) = payload?;
    tracing::info!("Creating task: a={}, b={}", req.a, req.b);

    let task = state.tasks.create_task(req).await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// GET /tasks/{id}
/// Get a task with its result history
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    tracing::debug!("Getting task: {}", id);

    let detail = state.tasks.get_task(id).await?;
    Ok(Json(detail))
}

/// GET /tasks
/// List all tasks, newest first
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskSummary>>> {
    tracing::debug!("Listing all tasks");

    let tasks = state.tasks.list_tasks().await?;
    Ok(Json(tasks))
}
