//! # Sparhund Configuration System
//!
//! Hierarchical configuration management for the sparhund connection
//! tracker.
//!
//! ## Features
//! - **Unified Configuration**: Single source of truth across all components
//! - **Validation**: Runtime validation of critical parameters
//! - **Environment Awareness**: File and environment-variable overrides

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod delivery;
mod error;
mod ingest;
mod telemetry;
mod tracker;
mod validation;

pub use delivery::DeliveryConfig;
pub use error::ConfigError;
pub use ingest::IngestConfig;
pub use telemetry::{MetricsConfig, TelemetryConfig, TracingConfig};
pub use tracker::TrackerConfig;

/// Top-level configuration container for all sparhund components.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct SparhundConfig {
    /// Bounded-history sizing.
    #[validate(nested)]
    pub tracker: TrackerConfig,

    /// Ingest channel parameters.
    #[validate(nested)]
    pub ingest: IngestConfig,

    /// Snapshot delivery parameters.
    #[validate(nested)]
    pub delivery: DeliveryConfig,

    /// Telemetry and observability configuration.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl SparhundConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/sparhund.yaml` - base settings. If missing, defaults are used.
    /// 3. `config/<environment>.yaml` - environment-specific overrides.
    /// 4. `SPARHUND_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SparhundConfig::default()));

        if Path::new("config/sparhund.yaml").exists() {
            figment = figment.merge(Yaml::file("config/sparhund.yaml"));
        }

        let env = std::env::var("SPARHUND_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        figment
            .merge(Env::prefixed("SPARHUND_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(SparhundConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SPARHUND_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_validation() {
        let config = SparhundConfig::default();
        config.validate().expect("Default config should validate");
    }

    #[test]
    fn environment_override() {
        std::env::set_var("SPARHUND_TRACKER__HISTORY_CAPACITY", "16384");
        let config = SparhundConfig::load().unwrap();
        assert_eq!(config.tracker.history_capacity, 16384);
        std::env::remove_var("SPARHUND_TRACKER__HISTORY_CAPACITY");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SparhundConfig::load_from_path("config/does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
