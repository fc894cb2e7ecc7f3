//! Caller-facing error types.
//!
//! Ingestion never surfaces errors; malformed events are dropped and
//! counted. Only query-surface misuse reaches the caller.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("unknown search scope {0:?} (expected: address, app, any)")]
    InvalidScope(String),

    #[error("unknown decision filter {0:?} (expected: any, blocked, allowed)")]
    InvalidDecisionFilter(String),
}
