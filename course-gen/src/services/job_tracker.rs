//! In-memory job status store
//!
//! Keyed by task id, shared between background generation tasks (writers)
//! and poll requests (readers). One `RwLock` guards the whole map, so
//! create/update/get are atomic with respect to each other and a reader
//! always receives a complete snapshot.
//!
//! The tracker is an injectable value rather than a process-wide singleton:
//! clones share the same store, separate `JobTracker::new()` calls do not.
//!
//! Update policy: updates to unknown task ids fail with
//! [`JobError::NotFound`]; updates to a job in a terminal state fail with
//! [`JobError::Terminal`] and leave the record untouched.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use course_common::events::{EventBus, JobEvent};

use crate::models::{JobState, JobStatus, JobUpdate};

/// Hex characters of randomness appended to the task type (48 bits)
const TASK_ID_SUFFIX_LEN: usize = 12;

/// Job tracker errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// No job was ever created with this id
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Job already completed, failed or was cancelled
    #[error("Job {task_id} is already {state:?}, update rejected")]
    Terminal { task_id: String, state: JobState },

    /// Status would move backwards (e.g. running → pending)
    #[error("Invalid transition for job {task_id}: {from:?} → {to:?}")]
    InvalidTransition {
        task_id: String,
        from: JobState,
        to: JobState,
    },
}

/// Shared job status store
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    event_bus: Option<EventBus>,
}

impl JobTracker {
    /// Tracker without event broadcasting
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that publishes every accepted change on `event_bus`
    pub fn with_event_bus(event_bus: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_bus: Some(event_bus),
        }
    }

    /// Register a new `pending` job and return its id
    ///
    /// Ids look like `textbook_3f9a0c1b72de`.
    pub async fn create(&self, task_type: &str) -> String {
        let status = {
            let mut jobs = self.jobs.write().await;
            let task_id = loop {
                let candidate = generate_task_id(task_type);
                if !jobs.contains_key(&candidate) {
                    break candidate;
                }
            };
            let status = JobStatus::new(task_id.clone(), task_type.to_string());
            jobs.insert(task_id, status.clone());
            status
        };

        tracing::debug!(task_id = %status.task_id, task_type, "Job created");

        self.emit(JobEvent::JobCreated {
            task_id: status.task_id.clone(),
            task_type: status.task_type,
            timestamp: status.created_at,
        });

        status.task_id
    }

    /// Merge fields into an existing job
    ///
    /// - progress is clamped to [0, 1] and never decreases
    /// - `completed` forces progress to 1.0
    /// - `result` is only kept with `completed`, `error` only with `failed`
    ///
    /// Returns the updated snapshot.
    pub async fn update(&self, task_id: &str, update: JobUpdate) -> Result<JobStatus, JobError> {
        let snapshot = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(task_id)
                .ok_or_else(|| JobError::NotFound(task_id.to_string()))?;

            if job.status.is_terminal() {
                return Err(JobError::Terminal {
                    task_id: task_id.to_string(),
                    state: job.status,
                });
            }

            let next_state = update.status.unwrap_or(job.status);
            if next_state == JobState::Pending && job.status == JobState::Running {
                return Err(JobError::InvalidTransition {
                    task_id: task_id.to_string(),
                    from: job.status,
                    to: next_state,
                });
            }

            job.status = next_state;

            if let Some(progress) = update.progress {
                let clamped = if progress.is_finite() {
                    progress.clamp(0.0, 1.0)
                } else {
                    job.progress
                };
                job.progress = job.progress.max(clamped);
            }

            if let Some(step) = update.current_step {
                job.current_step = step;
            }

            match next_state {
                JobState::Completed => {
                    job.progress = 1.0;
                    job.result = update.result;
                    job.error = None;
                }
                JobState::Failed => {
                    job.error = Some(
                        update
                            .error
                            .unwrap_or_else(|| "Unknown error".to_string()),
                    );
                    job.result = None;
                }
                _ => {
                    if update.result.is_some() || update.error.is_some() {
                        tracing::warn!(
                            task_id,
                            state = ?next_state,
                            "Ignoring result/error on non-terminal job update"
                        );
                    }
                }
            }

            job.updated_at = Utc::now();
            job.clone()
        };

        self.emit_for(&snapshot);
        Ok(snapshot)
    }

    /// Current snapshot, or `None` if the id was never created
    pub async fn get(&self, task_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(task_id).cloned()
    }

    /// Remove every job
    pub async fn clear(&self) {
        self.jobs.write().await.clear();
    }

    /// Number of tracked jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Jobs that are pending or running
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.status.is_terminal())
            .count()
    }

    fn emit_for(&self, status: &JobStatus) {
        let event = match status.status {
            JobState::Pending | JobState::Running => JobEvent::JobProgress {
                task_id: status.task_id.clone(),
                progress: status.progress,
                current_step: status.current_step.clone(),
                timestamp: status.updated_at,
            },
            JobState::Completed => JobEvent::JobCompleted {
                task_id: status.task_id.clone(),
                timestamp: status.updated_at,
            },
            JobState::Failed => JobEvent::JobFailed {
                task_id: status.task_id.clone(),
                error: status.error.clone().unwrap_or_default(),
                timestamp: status.updated_at,
            },
            JobState::Cancelled => JobEvent::JobCancelled {
                task_id: status.task_id.clone(),
                timestamp: status.updated_at,
            },
        };
        self.emit(event);
    }

    fn emit(&self, event: JobEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}

fn generate_task_id(task_type: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", task_type, &suffix[..TASK_ID_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_prefixes_task_type() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;

        assert!(task_id.starts_with("textbook_"));
        assert_eq!(task_id.len(), "textbook_".len() + TASK_ID_SUFFIX_LEN);

        let status = tracker.get(&task_id).await.unwrap();
        assert_eq!(status.status, JobState::Pending);
        assert_eq!(status.progress, 0.0);
        assert!(status.result.is_none());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let tracker = JobTracker::new();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..200 {
            assert!(ids.insert(tracker.create("textbook").await));
        }
        assert_eq!(tracker.len().await, 200);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let tracker = JobTracker::new();
        assert!(tracker.get("textbook_000000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let tracker = JobTracker::new();
        let err = tracker
            .update("missing", JobUpdate::running(0.5, "step"))
            .await
            .unwrap_err();
        assert_eq!(err, JobError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_update_after_completed_is_rejected() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;

        tracker
            .update(&task_id, JobUpdate::completed(json!({"ok": true})))
            .await
            .unwrap();

        let err = tracker
            .update(&task_id, JobUpdate::running(0.3, "again"))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Terminal { state: JobState::Completed, .. }));

        let status = tracker.get(&task_id).await.unwrap();
        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.progress, 1.0);
        assert_eq!(status.result, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_update_after_cancelled_is_rejected() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;
        tracker.update(&task_id, JobUpdate::cancelled()).await.unwrap();

        let err = tracker
            .update(&task_id, JobUpdate::failed("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Terminal { state: JobState::Cancelled, .. }));
    }

    #[tokio::test]
    async fn test_progress_clamped_and_monotonic() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;

        let s = tracker.update(&task_id, JobUpdate::running(0.4, "a")).await.unwrap();
        assert_eq!(s.progress, 0.4);

        let s = tracker.update(&task_id, JobUpdate::running(0.2, "b")).await.unwrap();
        assert_eq!(s.progress, 0.4);
        assert_eq!(s.current_step, "b");

        let s = tracker.update(&task_id, JobUpdate::running(7.0, "c")).await.unwrap();
        assert_eq!(s.progress, 1.0);

        let s = tracker
            .update(&task_id, JobUpdate::running(f64::NAN, "d"))
            .await
            .unwrap();
        assert_eq!(s.progress, 1.0);
    }

    #[tokio::test]
    async fn test_running_cannot_return_to_pending() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;
        tracker.update(&task_id, JobUpdate::running(0.1, "a")).await.unwrap();

        let update = JobUpdate {
            status: Some(JobState::Pending),
            ..JobUpdate::default()
        };
        let err = tracker.update(&task_id, update).await.unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_failed_keeps_error_drops_result() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;

        let update = JobUpdate {
            result: Some(json!({"partial": true})),
            ..JobUpdate::failed("outline: provider error")
        };
        let status = tracker.update(&task_id, update).await.unwrap();

        assert_eq!(status.status, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("outline: provider error"));
        assert!(status.result.is_none());
        assert!(status.progress < 1.0);
    }

    #[tokio::test]
    async fn test_result_ignored_while_running() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;

        let update = JobUpdate {
            result: Some(json!({"early": true})),
            ..JobUpdate::running(0.5, "sections")
        };
        let status = tracker.update(&task_id, update).await.unwrap();
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;
        tracker.clear().await;

        assert!(tracker.is_empty().await);
        assert!(tracker.get(&task_id).await.is_none());
    }

    #[tokio::test]
    async fn test_separate_trackers_are_isolated() {
        let a = JobTracker::new();
        let b = JobTracker::new();
        let task_id = a.create("textbook").await;

        assert!(b.get(&task_id).await.is_none());
        // Clones share the store
        assert!(a.clone().get(&task_id).await.is_some());
    }

    #[tokio::test]
    async fn test_events_published_for_lifecycle() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let tracker = JobTracker::with_event_bus(bus);

        let task_id = tracker.create("textbook").await;
        tracker.update(&task_id, JobUpdate::running(0.2, "outline")).await.unwrap();
        tracker.update(&task_id, JobUpdate::completed(json!({}))).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "JobCreated");
        assert_eq!(rx.recv().await.unwrap().event_type(), "JobProgress");
        let done = rx.recv().await.unwrap();
        assert_eq!(done.event_type(), "JobCompleted");
        assert_eq!(done.task_id(), task_id);
    }

    #[tokio::test]
    async fn test_active_count() {
        let tracker = JobTracker::new();
        let a = tracker.create("textbook").await;
        let _b = tracker.create("textbook").await;
        tracker.update(&a, JobUpdate::failed("boom")).await.unwrap();

        assert_eq!(tracker.active_count().await, 1);
    }
}
