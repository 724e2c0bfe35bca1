//! Asynchronous job status
//!
//! Lifecycle: PENDING → RUNNING → COMPLETED | FAILED | CANCELLED
//! (a pending job may also be cancelled or fail before it starts running)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, waiting for a generation slot
    Pending,
    /// Generation in progress
    Running,
    /// Finished successfully, result attached
    Completed,
    /// Finished with an error, message attached
    Failed,
    /// Stopped on request before finishing
    Cancelled,
}

impl JobState {
    /// Terminal states accept no further updates
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Snapshot of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// `<task_type>_<random hex>`
    pub task_id: String,
    pub task_type: String,
    pub status: JobState,
    /// Fraction complete in [0, 1]
    pub progress: f64,
    pub current_step: String,
    /// Present only when `status` is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Present only when `status` is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub(crate) fn new(task_id: String, task_type: String) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            task_type,
            status: JobState::Pending,
            progress: 0.0,
            current_step: "Queued".to_string(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Fields to merge into an existing job
///
/// `None` leaves the current value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobState>,
    pub progress: Option<f64>,
    pub current_step: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl JobUpdate {
    /// Running job advanced to a new step
    pub fn running(progress: f64, current_step: impl Into<String>) -> Self {
        Self {
            status: Some(JobState::Running),
            progress: Some(progress),
            current_step: Some(current_step.into()),
            ..Self::default()
        }
    }

    /// Successful completion with the result payload
    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            status: Some(JobState::Completed),
            progress: Some(1.0),
            current_step: Some("Completed".to_string()),
            result: Some(result),
            ..Self::default()
        }
    }

    /// Failure with the originating error message
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobState::Failed),
            current_step: Some("Failed".to_string()),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Stopped on request
    pub fn cancelled() -> Self {
        Self {
            status: Some(JobState::Cancelled),
            current_step: Some("Cancelled".to_string()),
            ..Self::default()
        }
    }
}
