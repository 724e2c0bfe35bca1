//! Chapter generation orchestrator
//!
//! Drives one chapter through outline → sections → assembly → coherence →
//! persist. Sections are written strictly in order: each prompt carries the
//! key concepts of every section before it.
//!
//! # Failure and cancellation
//! Any step failing ends the run with that step's error and nothing is
//! written. The cancellation token is raced against every model call and
//! checked again before persisting, so a cancelled run also writes nothing.
//! The chapter is saved exactly once, after the course is reloaded, so edits
//! made to the course during generation are not overwritten.

mod phase;
mod progress;

pub use phase::ChapterPhase;
pub use progress::{JobProgressReporter, LoggingProgressReporter, ProgressReporter};

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::CourseStore;
use crate::models::{Assembly, Chapter, ChapterContext, CoherenceIssue, Outline, Section};
use crate::services::coherence_checker::CoherenceChecker;
use crate::services::metadata_estimator::estimate_chapter_text;
use crate::services::section_generator::{GenerationError, SectionGenerator};

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] course_common::Error),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Learning outcome {outcome_id} not found in course {course_id}")]
    LearningOutcomeNotFound {
        course_id: String,
        outcome_id: String,
    },

    #[error("Generation cancelled")]
    Cancelled,
}

/// What to generate and where to store it
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRequest {
    pub owner_id: String,
    pub course_id: String,
    pub learning_outcome_id: String,
    /// Job the run reports to, recorded on the chapter
    pub task_id: Option<String>,
}

/// One run's current phase, advanced forward only
struct ChapterRun<'a> {
    phase: ChapterPhase,
    request: &'a ChapterRequest,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> ChapterRun<'a> {
    async fn enter(&mut self, next: ChapterPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(from = %self.phase, to = %next, "Ignoring out-of-order phase transition");
            return;
        }
        self.phase = next;

        tracing::debug!(
            task_id = self.request.task_id.as_deref().unwrap_or("-"),
            course_id = %self.request.course_id,
            phase = %next,
            "Chapter phase"
        );

        if !next.is_terminal() {
            self.reporter.report(next.progress(), &next.to_string()).await;
        }
    }
}

/// Chapter orchestrator service
#[derive(Clone)]
pub struct ChapterOrchestrator {
    generator: SectionGenerator,
    checker: CoherenceChecker,
    store: Arc<dyn CourseStore>,
}

impl ChapterOrchestrator {
    pub fn new(generator: SectionGenerator, checker: CoherenceChecker, store: Arc<dyn CourseStore>) -> Self {
        Self {
            generator,
            checker,
            store,
        }
    }

    pub fn store(&self) -> Arc<dyn CourseStore> {
        Arc::clone(&self.store)
    }

    /// Run the full pipeline and persist the chapter
    ///
    /// Always starts from a fresh outline. Returns the persisted chapter.
    pub async fn run(
        &self,
        request: &ChapterRequest,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Chapter, OrchestratorError> {
        let mut run = ChapterRun {
            phase: ChapterPhase::NotStarted,
            request,
            reporter,
        };

        match self.execute(&mut run, cancel).await {
            Ok(chapter) => {
                run.enter(ChapterPhase::Persisted).await;
                tracing::info!(
                    task_id = request.task_id.as_deref().unwrap_or("-"),
                    course_id = %request.course_id,
                    chapter_id = %chapter.id,
                    sections = chapter.sections.len(),
                    words = chapter.word_count,
                    issues = chapter.coherence_issues.len(),
                    "Chapter generated"
                );
                Ok(chapter)
            }
            Err(e) => {
                let failed_in = run.phase;
                let terminal = match e {
                    OrchestratorError::Cancelled => ChapterPhase::Cancelled,
                    _ => ChapterPhase::Failed,
                };
                run.enter(terminal).await;
                tracing::warn!(
                    task_id = request.task_id.as_deref().unwrap_or("-"),
                    course_id = %request.course_id,
                    phase = %failed_in,
                    error = %e,
                    "Chapter generation stopped"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run: &mut ChapterRun<'_>,
        cancel: &CancellationToken,
    ) -> Result<Chapter, OrchestratorError> {
        let request = run.request;
        let course = self
            .store
            .load(&request.owner_id, &request.course_id)
            .await?
            .ok_or_else(|| OrchestratorError::CourseNotFound(request.course_id.clone()))?;

        let outcome = course
            .learning_outcome(&request.learning_outcome_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::LearningOutcomeNotFound {
                course_id: request.course_id.clone(),
                outcome_id: request.learning_outcome_id.clone(),
            })?;
        let topic = course.topic().to_string();

        // Outline
        ensure_active(cancel)?;
        run.enter(ChapterPhase::Outline).await;
        let outline: Outline =
            guarded(cancel, self.generator.generate_outline(&outcome.behavior, &topic)).await??;

        let context = ChapterContext {
            title: outline.title.clone(),
            learning_outcome: outcome.behavior.clone(),
            topic,
        };

        // Sections, strictly sequential
        let total = outline.sections.len();
        let mut sections: Vec<Section> = Vec::with_capacity(total);
        for (index, descriptor) in outline.sections.iter().enumerate() {
            ensure_active(cancel)?;
            run.enter(ChapterPhase::Sections { index, total }).await;
            let section = guarded(
                cancel,
                self.generator.generate_section(descriptor, &context, &sections),
            )
            .await??;
            sections.push(section);
        }

        // Assembly
        ensure_active(cancel)?;
        run.enter(ChapterPhase::Assembly).await;
        let assembly: Assembly = guarded(
            cancel,
            self.generator
                .generate_assembly(&context.title, &sections, &context.learning_outcome),
        )
        .await??;

        // Coherence
        ensure_active(cancel)?;
        run.enter(ChapterPhase::CoherenceCheck).await;
        let model = self.generator.model();
        let issues: Vec<CoherenceIssue> = guarded(
            cancel,
            self.checker.check(model.as_ref(), &assembly.glossary, &sections),
        )
        .await?;

        let chapter = build_chapter(request, &context, sections, assembly, issues);

        // Persist once, against a freshly loaded course
        ensure_active(cancel)?;
        run.enter(ChapterPhase::Persisting).await;
        let mut latest = self
            .store
            .load(&request.owner_id, &request.course_id)
            .await?
            .ok_or_else(|| OrchestratorError::CourseNotFound(request.course_id.clone()))?;

        if let Some(previous) = latest.replace_chapter(chapter.clone()) {
            tracing::info!(
                course_id = %request.course_id,
                learning_outcome_id = %request.learning_outcome_id,
                previous_chapter_id = %previous.id,
                "Replacing existing chapter"
            );
        }
        self.store.save(&request.owner_id, &latest).await?;

        Ok(chapter)
    }
}

fn build_chapter(
    request: &ChapterRequest,
    context: &ChapterContext,
    sections: Vec<Section>,
    assembly: Assembly,
    coherence_issues: Vec<CoherenceIssue>,
) -> Chapter {
    let metadata = estimate_chapter_text(&assembly.introduction, &sections, &assembly.conclusion);

    Chapter {
        id: Uuid::new_v4(),
        learning_outcome_id: request.learning_outcome_id.clone(),
        title: context.title.clone(),
        introduction: assembly.introduction,
        sections,
        conclusion: assembly.conclusion,
        glossary: assembly.glossary,
        references: assembly.references,
        image_placeholders: assembly.image_placeholders,
        coherence_issues,
        word_count: metadata.word_count,
        estimated_minutes: metadata.duration_minutes,
        task_id: request.task_id.clone(),
        generated_at: Utc::now(),
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), OrchestratorError> {
    if cancel.is_cancelled() {
        Err(OrchestratorError::Cancelled)
    } else {
        Ok(())
    }
}

/// Await `fut` unless the token fires first
async fn guarded<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, OrchestratorError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
        value = fut => Ok(value),
    }
}
