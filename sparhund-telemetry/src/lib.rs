//! # sparhund-telemetry
//!
//! Observability for the connection tracker: structured logging via
//! `tracing` and a Prometheus metrics recorder. Nothing here sits on the
//! ingest hot path; recording a dropped event must never drop another.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
