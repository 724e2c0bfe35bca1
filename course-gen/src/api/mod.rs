//! HTTP API handlers for course-gen
//!
//! JSON over HTTP plus one SSE stream for job events.

pub mod chapters;
pub mod courses;
pub mod health;
pub mod sse;
pub mod tasks;

pub use chapters::chapter_routes;
pub use courses::course_routes;
pub use health::health_routes;
pub use sse::job_event_stream;
pub use tasks::task_routes;

/// Owner used when a request does not name one
pub const DEFAULT_OWNER_ID: &str = "local";

pub(crate) fn default_owner_id() -> String {
    DEFAULT_OWNER_ID.to_string()
}
