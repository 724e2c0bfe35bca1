//! course-gen library interface
//!
//! Chapter generation pipeline (outline → sections → assembly → coherence),
//! the job tracker that surfaces its progress, and the HTTP API around them.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use course_common::config::GenerationConfig;
use course_common::events::EventBus;

use crate::db::CourseStore;
use crate::services::{
    ChapterOrchestrator, CoherenceChecker, GenerationQueue, GenerativeCall, JobTracker,
    SectionGenerator,
};

/// Capacity of the job event broadcast channel
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Course documents
    pub store: Arc<dyn CourseStore>,
    /// Job status store polled by clients
    pub tracker: JobTracker,
    /// Bounded background chapter runs
    pub queue: GenerationQueue,
    /// Job events for SSE clients
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the pipeline over a model and a course store
    pub fn new(
        model: Arc<dyn GenerativeCall>,
        store: Arc<dyn CourseStore>,
        generation: &GenerationConfig,
    ) -> Self {
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let tracker = JobTracker::with_event_bus(event_bus.clone());

        let orchestrator = ChapterOrchestrator::new(
            SectionGenerator::new(model),
            CoherenceChecker::new(generation.redundancy_threshold),
            Arc::clone(&store),
        );
        let queue = GenerationQueue::new(orchestrator, tracker.clone(), generation.max_concurrent_jobs);

        Self {
            store,
            tracker,
            queue,
            event_bus,
            startup_time: course_common::time::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::chapter_routes())
        .merge(api::task_routes())
        .merge(api::course_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
