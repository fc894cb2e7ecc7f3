//! Ingest channel configuration.
//!
//! Parameters for the bounded channel between the data-path collaborator
//! and the tracker drain loop.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct IngestConfig {
    /// Capacity of the ingest channel (must be a power of two).
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 128, max = 1_048_576))]
    #[validate(custom(function = validation::validate_power_of_two))]
    pub channel_capacity: usize,

    /// Behavior when the channel is full: producers `block`, or the event
    /// is `drop`ped and counted.
    #[validate(custom(function = validation::validate_full_queue_strategy))]
    #[serde(default = "default_full_queue_strategy")]
    pub full_queue_strategy: String,
}

fn default_channel_capacity() -> usize {
    4096
}

fn default_full_queue_strategy() -> String {
    "block".into()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            full_queue_strategy: default_full_queue_strategy(),
        }
    }
}
