//! Bounded background execution of chapter runs
//!
//! `submit` validates the request, creates a `pending` job and returns its id
//! immediately. The run itself is a tokio task that waits for a semaphore
//! permit, so at most `max_concurrent_jobs` chapters generate at once; the
//! rest stay `pending` until a slot frees up.
//!
//! Every outcome of the background task is recorded into the job: success
//! as `completed` with the chapter as result, errors as `failed` with the
//! message, cancellation as `cancelled`, and a panic as `failed`.
//!
//! Cancelling fires the job's token. A job still waiting for a permit never
//! starts; a running job stops at its next model call. A run that has
//! already begun saving completes normally.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::models::JobUpdate;
use crate::services::chapter_orchestrator::{
    ChapterOrchestrator, ChapterRequest, JobProgressReporter, OrchestratorError,
};
use crate::services::job_tracker::{JobError, JobTracker};

/// Task type tag for chapter jobs
pub const TEXTBOOK_TASK_TYPE: &str = "textbook";

/// Submits chapter runs and tracks their cancellation tokens
#[derive(Clone)]
pub struct GenerationQueue {
    orchestrator: ChapterOrchestrator,
    tracker: JobTracker,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    /// Tokens of jobs that have not finished yet
    tokens: Arc<RwLock<HashMap<String, CancellationToken>>>,
}

impl GenerationQueue {
    pub fn new(orchestrator: ChapterOrchestrator, tracker: JobTracker, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            orchestrator,
            tracker,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs currently holding a generation slot
    pub fn running_count(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Validate, create a job and start the run in the background
    ///
    /// Fails without creating a job when the course or learning outcome
    /// does not exist.
    pub async fn submit(
        &self,
        owner_id: &str,
        course_id: &str,
        learning_outcome_id: &str,
    ) -> Result<String, OrchestratorError> {
        let course = self
            .orchestrator
            .store()
            .load(owner_id, course_id)
            .await?
            .ok_or_else(|| OrchestratorError::CourseNotFound(course_id.to_string()))?;

        if course.learning_outcome(learning_outcome_id).is_none() {
            return Err(OrchestratorError::LearningOutcomeNotFound {
                course_id: course_id.to_string(),
                outcome_id: learning_outcome_id.to_string(),
            });
        }

        let task_id = self.tracker.create(TEXTBOOK_TASK_TYPE).await;
        let token = CancellationToken::new();
        self.tokens
            .write()
            .await
            .insert(task_id.clone(), token.clone());

        let request = ChapterRequest {
            owner_id: owner_id.to_string(),
            course_id: course_id.to_string(),
            learning_outcome_id: learning_outcome_id.to_string(),
            task_id: Some(task_id.clone()),
        };

        tracing::info!(
            task_id = %task_id,
            course_id,
            learning_outcome_id,
            "Chapter generation submitted"
        );

        let queue = self.clone();
        let id_for_supervisor = task_id.clone();
        tokio::spawn(async move {
            let worker = {
                let queue = queue.clone();
                tokio::spawn(async move { queue.execute(request, token).await })
            };

            if let Err(join_error) = worker.await {
                tracing::error!(
                    task_id = %id_for_supervisor,
                    error = %join_error,
                    "Chapter generation task aborted"
                );
                queue
                    .record(
                        &id_for_supervisor,
                        JobUpdate::failed(format!("Generation task aborted: {}", join_error)),
                    )
                    .await;
            }
            queue.tokens.write().await.remove(&id_for_supervisor);
        });

        Ok(task_id)
    }

    /// Request cancellation of a pending or running job
    pub async fn cancel(&self, task_id: &str) -> Result<(), JobError> {
        let status = self
            .tracker
            .get(task_id)
            .await
            .ok_or_else(|| JobError::NotFound(task_id.to_string()))?;

        if status.is_terminal() {
            return Err(JobError::Terminal {
                task_id: task_id.to_string(),
                state: status.status,
            });
        }

        if let Some(token) = self.tokens.read().await.get(task_id) {
            token.cancel();
            tracing::info!(task_id, "Chapter generation cancellation requested");
        }
        Ok(())
    }

    async fn execute(&self, request: ChapterRequest, token: CancellationToken) {
        let task_id = request.task_id.clone().unwrap_or_default();

        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!(task_id = %task_id, "Chapter generation cancelled before start");
                self.record(&task_id, JobUpdate::cancelled()).await;
                return;
            }
            permit = Arc::clone(&self.permits).acquire_owned() => permit,
        };

        let _permit = match permit {
            Ok(permit) => permit,
            Err(_) => {
                self.record(&task_id, JobUpdate::failed("Generation queue closed")).await;
                return;
            }
        };

        tracing::info!(task_id = %task_id, "Chapter generation started");
        let reporter = JobProgressReporter::new(self.tracker.clone(), task_id.clone());

        let update = match self.orchestrator.run(&request, &reporter, &token).await {
            Ok(chapter) => match serde_json::to_value(&chapter) {
                Ok(result) => JobUpdate::completed(result),
                Err(e) => JobUpdate::failed(format!("Failed to serialize chapter: {}", e)),
            },
            Err(OrchestratorError::Cancelled) => JobUpdate::cancelled(),
            Err(e) => JobUpdate::failed(e.to_string()),
        };

        self.record(&task_id, update).await;
    }

    async fn record(&self, task_id: &str, update: JobUpdate) {
        if let Err(e) = self.tracker.update(task_id, update).await {
            tracing::warn!(task_id, error = %e, "Final job update rejected");
        }
    }
}
