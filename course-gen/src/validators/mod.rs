//! Validation of structured model output
//!
//! Every model response passes through [`schema::validate`] before the
//! pipeline uses it.

pub mod contracts;
pub mod schema;

pub use schema::{check, validate, FieldKind, FieldRule, SchemaDescriptor, SchemaViolation};
