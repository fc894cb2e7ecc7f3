//! Custom validation functions for configuration.
//!
//! Shared validation logic used across multiple configuration modules.

use validator::ValidationError;

/// Validate that a given value is a power of two.
pub fn validate_power_of_two(value: usize) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_power_of_two"))
    }
}

/// Validate the full-queue strategy for the ingest channel.
pub fn validate_full_queue_strategy(strategy: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(block|drop)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(strategy) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_full_queue_strategy"))
    }
}
