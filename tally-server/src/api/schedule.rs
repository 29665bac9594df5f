//! Schedule API Handlers
//!
//! HTTP endpoints for recurring task schedules.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tally_core::dto::schedule::{ScheduleRequest, ScheduleView};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /task-schedules
/// Create a schedule and its task
pub async fn create_schedule(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ScheduleView>)> {
    let Json(req) = payload?;
    tracing::info!(
        "Creating schedule: a={}, b={}, every {}s from {}",
        req.a,
        req.b,
        req.interval,
        req.scheduled_at
    );

    let scheduled = state.schedules.create_schedule(req).await?;

    Ok((StatusCode::CREATED, Json(scheduled.into())))
}

/// GET /task-schedules
/// List all schedules, newest first
pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<Json<Vec<ScheduleView>>> {
    tracing::debug!("Listing all schedules");

    let schedules = state.schedules.list_schedules().await?;
    Ok(Json(schedules.into_iter().map(ScheduleView::from).collect()))
}

/// GET /task-schedules/{id}
/// Get a schedule by ID
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ScheduleView>> {
    tracing::debug!("Getting schedule: {}", id);

    let scheduled = state.schedules.get_schedule(id).await?;
    Ok(Json(scheduled.into()))
}

/// PUT /task-schedules/{id}
/// Replace operands and timing of a schedule
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> ApiResult<Json<ScheduleView>> {
    let Json(req) = payload?;
    tracing::info!("Updating schedule: {}", id);

    let scheduled = state.schedules.update_schedule(id, req).await?;
    Ok(Json(scheduled.into()))
}

/// DELETE /task-schedules/{id}
/// Delete a schedule, its task and its trigger definitions
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting schedule: {}", id);

    state.schedules.delete_schedule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
