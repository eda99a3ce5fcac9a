//! Error types for planning jobs.
//!
//! Only fatal conditions are errors: a broken configuration, a matrix that
//! cannot be unravelled, or an internal fault. Degraded-but-usable outcomes
//! (timeout, stagnation, a best-effort schedule with remaining violations)
//! are carried in the success payload instead, so the caller keeps the
//! incumbent result.

use thiserror::Error;

use crate::validation::ValidationError;

/// A specialized Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;

/// Fatal planning errors.
#[derive(Error, Debug)]
pub enum PlanError {
    /// The configuration is contradictory or incomplete. Rejected before
    /// any evolution starts.
    #[error("invalid configuration ({} problem(s)): {}", .0.len(), first_message(.0))]
    ConfigInvalid(Vec<ValidationError>),

    /// The greedy builder cannot derive a month from the matrices.
    #[error("no valid baseline: {0}")]
    NoValidBaseline(String),

    /// Unexpected internal fault.
    #[error("execution error: {0}")]
    Execution(String),
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("unknown")
}
