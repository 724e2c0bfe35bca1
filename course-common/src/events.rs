//! Event types for job progress broadcasting
//!
//! Provides the job lifecycle events and the EventBus used to fan them out
//! to SSE subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Job lifecycle events
///
/// Emitted by the job tracker on every accepted status change and
/// serialized as-is for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// New job registered in `pending` state
    JobCreated {
        task_id: String,
        task_type: String,
        timestamp: DateTime<Utc>,
    },

    /// Running job advanced
    JobProgress {
        task_id: String,
        /// Fraction complete in [0, 1]
        progress: f64,
        /// Human-readable step label
        current_step: String,
        timestamp: DateTime<Utc>,
    },

    /// Job finished successfully
    JobCompleted {
        task_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Job ended with an error
    JobFailed {
        task_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Job cancelled on request
    JobCancelled {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            JobEvent::JobCreated { .. } => "JobCreated",
            JobEvent::JobProgress { .. } => "JobProgress",
            JobEvent::JobCompleted { .. } => "JobCompleted",
            JobEvent::JobFailed { .. } => "JobFailed",
            JobEvent::JobCancelled { .. } => "JobCancelled",
        }
    }

    /// Task identifier the event refers to
    pub fn task_id(&self) -> &str {
        match self {
            JobEvent::JobCreated { task_id, .. }
            | JobEvent::JobProgress { task_id, .. }
            | JobEvent::JobCompleted { task_id, .. }
            | JobEvent::JobFailed { task_id, .. }
            | JobEvent::JobCancelled { task_id, .. } => task_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged subscribers skip old events instead of stalling the bus
///
/// # Examples
///
/// ```
/// use course_common::events::{EventBus, JobEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(JobEvent::JobCompleted {
///     task_id: "textbook_0123456789ab".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns the number of subscribers that received it, or an error when
    /// nobody is listening.
    pub fn emit(
        &self,
        event: JobEvent,
    ) -> Result<usize, broadcast::error::SendError<JobEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: JobEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for job event");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
