//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed since `since`, never negative
pub fn elapsed_seconds(since: DateTime<Utc>) -> u64 {
    Utc::now().signed_duration_since(since).num_seconds().max(0) as u64
}
