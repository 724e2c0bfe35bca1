//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE stream construction for job progress events.

use crate::events::JobEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Interval between heartbeat comments
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream forwarding job events from a broadcast receiver
///
/// When `task_filter` is set only events for that task id are forwarded.
/// The stream sends an initial `ConnectionStatus` event, a heartbeat comment
/// every 15 seconds, and ends when the bus is dropped.
pub fn create_job_event_stream(
    mut rx: broadcast::Receiver<JobEvent>,
    task_filter: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(task_filter = ?task_filter, "New SSE client connected to job events");

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            if let Some(filter) = &task_filter {
                                if event.task_id() != filter {
                                    continue;
                                }
                            }

                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    debug!("SSE: Broadcasting job event: {}", event_type);
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE: Subscriber lagged, events dropped");
                        }
                        Err(RecvError::Closed) => {
                            info!("SSE: Event bus closed, ending stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
