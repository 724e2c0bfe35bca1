//! Chapter generation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::default_owner_id;
use crate::models::{Chapter, JobState};
use crate::{ApiError, ApiResult, AppState};

/// POST /courses/{course_id}/chapters/generate request
#[derive(Debug, Deserialize)]
pub struct GenerateChapterRequest {
    pub learning_outcome_id: String,
    #[serde(default = "default_owner_id")]
    pub owner_id: String,
}

/// POST /courses/{course_id}/chapters/generate response
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateChapterResponse {
    pub task_id: String,
    pub status: JobState,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(default = "default_owner_id")]
    pub owner_id: String,
}

/// POST /courses/{course_id}/chapters/generate
///
/// Returns 202 with a task id immediately; poll `/tasks/{task_id}` for progress.
pub async fn generate_chapter(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(request): Json<GenerateChapterRequest>,
) -> ApiResult<(StatusCode, Json<GenerateChapterResponse>)> {
    if request.learning_outcome_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "learning_outcome_id must not be empty".to_string(),
        ));
    }

    let task_id = state
        .queue
        .submit(&request.owner_id, &course_id, &request.learning_outcome_id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateChapterResponse {
            task_id,
            status: JobState::Pending,
        }),
    ))
}

/// GET /courses/{course_id}/chapters/{learning_outcome_id}
pub async fn get_chapter(
    State(state): State<AppState>,
    Path((course_id, learning_outcome_id)): Path<(String, String)>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Chapter>> {
    let course = state
        .store
        .load(&query.owner_id, &course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Course not found: {}", course_id)))?;

    course
        .chapter_for(&learning_outcome_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No chapter for learning outcome {} in course {}",
                learning_outcome_id, course_id
            ))
        })
}

/// Build chapter routes
pub fn chapter_routes() -> Router<AppState> {
    Router::new()
        .route("/courses/:course_id/chapters/generate", post(generate_chapter))
        .route(
            "/courses/:course_id/chapters/:learning_outcome_id",
            get(get_chapter),
        )
}
