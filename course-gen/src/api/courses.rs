//! Course document endpoints
//!
//! Minimal read/write surface so courses and learning outcomes can be set up
//! before chapters are generated for them.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use super::chapters::OwnerQuery;
use crate::models::Course;
use crate::{ApiError, ApiResult, AppState};

/// GET /courses/{course_id}
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Course>> {
    state
        .store
        .load(&query.owner_id, &course_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Course not found: {}", course_id)))
}

/// PUT /courses/{course_id}
///
/// Stores the whole document under its `owner_id`. The path id must match
/// the body id.
pub async fn put_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(mut course): Json<Course>,
) -> ApiResult<Json<Course>> {
    if course.id != course_id {
        return Err(ApiError::BadRequest(format!(
            "Course id in body ({}) does not match path ({})",
            course.id, course_id
        )));
    }
    if course.owner_id.trim().is_empty() {
        return Err(ApiError::BadRequest("owner_id must not be empty".to_string()));
    }

    course.updated_at = Utc::now();
    state.store.save(&course.owner_id, &course).await?;

    tracing::info!(course_id = %course.id, owner_id = %course.owner_id, "Course stored");
    Ok(Json(course))
}

/// Build course routes
pub fn course_routes() -> Router<AppState> {
    Router::new().route("/courses/:course_id", get(get_course).put(put_course))
}
