//! Snapshot delivery configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DeliveryConfig {
    /// Window over which rapid changes coalesce into one delivery (ms).
    /// Zero delivers on every change signal.
    #[validate(range(min = 0, max = 5_000))]
    #[serde(default = "default_coalesce_window_ms")]
    pub coalesce_window_ms: u64,

    /// Seed new subscriptions with the current snapshot when history is
    /// non-empty.
    #[serde(default = "default_true")]
    pub initial_snapshot: bool,
}

fn default_coalesce_window_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: default_coalesce_window_ms(),
            initial_snapshot: default_true(),
        }
    }
}
