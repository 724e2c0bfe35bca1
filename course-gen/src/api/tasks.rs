//! Job status polling and cancellation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::JobStatus;
use crate::{ApiError, ApiResult, AppState};

/// POST /tasks/{task_id}/cancel response
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub task_id: String,
    pub status: String,
}

/// GET /tasks/{task_id}
///
/// Unknown ids are 404, never a failed job.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let status = state
        .tracker
        .get(&task_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Task not found: {}", task_id)))?;

    tracing::debug!(task_id = %task_id, status = ?status.status, "Status query");
    Ok(Json(status))
}

/// POST /tasks/{task_id}/cancel
///
/// Accepted once the token fires; the job reaches `cancelled` when the run
/// observes it. Finished jobs answer 409.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<(StatusCode, Json<CancelResponse>)> {
    state.queue.cancel(&task_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            task_id,
            status: "cancelling".to_string(),
        }),
    ))
}

/// Build task routes
pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks/events", get(super::job_event_stream))
        .route("/tasks/:task_id", get(get_task))
        .route("/tasks/:task_id/cancel", post(cancel_task))
}
