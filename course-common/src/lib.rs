//! # Course Common Library
//!
//! Shared code for the course authoring services including:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Job event types and the EventBus
//! - Server-Sent Events helpers
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
