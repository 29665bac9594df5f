//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod schedule;
pub mod task;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Task endpoints
        .route("/tasks", post(task::create_task).get(task::list_tasks))
        .route("/tasks/{id}", get(task::get_task))
        // Schedule endpoints
        .route(
            "/task-schedules",
            post(schedule::create_schedule).get(schedule::list_schedules),
        )
        .route(
            "/task-schedules/{id}",
            get(schedule::get_schedule)
                .put(schedule::update_schedule)
                .delete(schedule::delete_schedule),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
