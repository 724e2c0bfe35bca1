//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Module name ("course-gen")
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Jobs pending or running
    pub active_jobs: usize,
    /// Jobs holding a generation slot
    pub running_jobs: usize,
    pub max_concurrent_jobs: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "course-gen".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: course_common::time::elapsed_seconds(state.startup_time),
        active_jobs: state.tracker.active_count().await,
        running_jobs: state.queue.running_count(),
        max_concurrent_jobs: state.queue.max_concurrent(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
