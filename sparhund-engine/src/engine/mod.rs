mod error;
mod event_processing;
mod runtime;

pub use self::{
    error::EngineError,
    event_processing::{DefaultEventProcessor, EventProcessor},
    runtime::{IngestSender, TrackerRuntime},
};
