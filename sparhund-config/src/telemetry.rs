//! Observability configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MetricsConfig {
    /// Enable the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TracingConfig {}

fn default_true() -> bool {
    true
}

/// Telemetry configuration.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Metrics collection parameters.
    #[validate(nested)]
    pub metrics: MetricsConfig,

    /// Tracing parameters.
    #[validate(nested)]
    pub tracing: TracingConfig,
}
