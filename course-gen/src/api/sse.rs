//! Server-Sent Events for job progress

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    /// Only stream events for this task
    pub task_id: Option<String>,
}

/// GET /tasks/events
///
/// Streams JobCreated, JobProgress, JobCompleted, JobFailed and JobCancelled.
pub async fn job_event_stream(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    course_common::sse::create_job_event_stream(state.event_bus.subscribe(), filter.task_id)
}
