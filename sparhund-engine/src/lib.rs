//! # sparhund-engine
//!
//! Composition root for the connection tracker. Owns the one
//! `ConnectionTracker` instance, drains the data-path collaborator's
//! ingest channel into it, and runs the coalescing snapshot delivery
//! loop. Consumers and the collaborator receive handles from here; there
//! is no ambient global tracker.

pub mod engine;

pub use engine::{
    DefaultEventProcessor, EngineError, EventProcessor, IngestSender, TrackerRuntime,
};
