//! Progress sinks for chapter runs
//!
//! The orchestrator only knows [`ProgressReporter`]; how progress surfaces
//! (job tracker for the HTTP service, log lines for the CLI) is up to the
//! implementation handed in.

use async_trait::async_trait;

use crate::models::JobUpdate;
use crate::services::job_tracker::JobTracker;

/// Receives (fraction, step label) after every phase transition
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, progress: f64, current_step: &str);
}

/// Forwards progress into a tracked job
pub struct JobProgressReporter {
    tracker: JobTracker,
    task_id: String,
}

impl JobProgressReporter {
    pub fn new(tracker: JobTracker, task_id: impl Into<String>) -> Self {
        Self {
            tracker,
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
impl ProgressReporter for JobProgressReporter {
    async fn report(&self, progress: f64, current_step: &str) {
        if let Err(e) = self
            .tracker
            .update(&self.task_id, JobUpdate::running(progress, current_step))
            .await
        {
            // Job was cancelled or otherwise finished underneath the run
            tracing::debug!(task_id = %self.task_id, error = %e, "Progress update rejected");
        }
    }
}

/// Writes progress to the log
pub struct LoggingProgressReporter;

#[async_trait]
impl ProgressReporter for LoggingProgressReporter {
    async fn report(&self, progress: f64, current_step: &str) {
        tracing::info!(
            percent = %format!("{:.0}%", progress * 100.0),
            step = current_step,
            "Chapter generation progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;

    #[tokio::test]
    async fn test_job_reporter_moves_job_to_running() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;
        let reporter = JobProgressReporter::new(tracker.clone(), task_id.clone());

        reporter.report(0.05, "Generating outline").await;

        let status = tracker.get(&task_id).await.unwrap();
        assert_eq!(status.status, JobState::Running);
        assert_eq!(status.progress, 0.05);
        assert_eq!(status.current_step, "Generating outline");
    }

    #[tokio::test]
    async fn test_job_reporter_ignores_terminal_job() {
        let tracker = JobTracker::new();
        let task_id = tracker.create("textbook").await;
        tracker.update(&task_id, JobUpdate::cancelled()).await.unwrap();

        let reporter = JobProgressReporter::new(tracker.clone(), task_id.clone());
        reporter.report(0.5, "late").await;

        assert_eq!(tracker.get(&task_id).await.unwrap().status, JobState::Cancelled);
    }
}
