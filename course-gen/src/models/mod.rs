//! Data models for course-gen
//!
//! - Outline and section descriptors planned before any content is written
//! - Generated sections and the assembled chapter artifact
//! - Asynchronous job status
//! - Courses and learning outcomes as persisted by the course store

pub mod chapter;
pub mod course;
pub mod job;
pub mod outline;

pub use chapter::{
    Assembly, Chapter, ChapterContext, CoherenceIssue, GlossaryEntry, ImagePlaceholder,
    ImageType, IssueKind, Section,
};
pub use course::{Course, LearningOutcome};
pub use job::{JobState, JobStatus, JobUpdate};
pub use outline::{Outline, SectionDescriptor, MAX_OUTLINE_SECTIONS, MIN_OUTLINE_SECTIONS};
