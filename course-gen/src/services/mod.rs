//! Chapter generation services
//!
//! Leaves first: metadata estimation and the job tracker have no model
//! dependency; the section generator and coherence checker each wrap one
//! model call per step; the orchestrator and queue drive them.

pub mod chapter_orchestrator;
pub mod coherence_checker;
pub mod generation_queue;
pub mod job_tracker;
pub mod llm_client;
pub mod metadata_estimator;
pub mod section_generator;

pub use chapter_orchestrator::{
    ChapterOrchestrator, ChapterPhase, ChapterRequest, JobProgressReporter,
    LoggingProgressReporter, OrchestratorError, ProgressReporter,
};
pub use coherence_checker::CoherenceChecker;
pub use generation_queue::{GenerationQueue, TEXTBOOK_TASK_TYPE};
pub use job_tracker::{JobError, JobTracker};
pub use llm_client::{AnthropicClient, GenerativeCall, ProviderError};
pub use metadata_estimator::{ContentKind, ContentMetadata, EstimateInput};
pub use section_generator::{GenerationCause, GenerationError, SectionGenerator};
