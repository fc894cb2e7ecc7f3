//! Tracker sizing configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Bounded-history parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TrackerConfig {
    /// Maximum number of retained connection events. Oldest entries are
    /// evicted first once the bound is reached.
    #[validate(range(min = 128, max = 1_048_576))]
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    8192
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}
