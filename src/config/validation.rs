//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backoffs and timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DiscoveryConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::DiscoveryConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("resolution.max_backoff_ms ({max}) is smaller than resolution.initial_backoff_ms ({initial})")]
    BackoffOrder { initial: u64, max: u64 },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

/// Check `config`, returning every problem found.
pub fn validate_config(config: &DiscoveryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let resolution = &config.resolution;

    if resolution.default_port == 0 {
        errors.push(ValidationError::NotPositive("resolution.default_port"));
    }
    if resolution.initial_backoff_ms == 0 {
        errors.push(ValidationError::NotPositive("resolution.initial_backoff_ms"));
    }
    if resolution.wait_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive("resolution.wait_timeout_ms"));
    }
    match resolution.max_backoff_ms {
        Some(0) => errors.push(ValidationError::NotPositive("resolution.max_backoff_ms")),
        Some(max) if resolution.initial_backoff_ms > 0 && max < resolution.initial_backoff_ms => {
            errors.push(ValidationError::BackoffOrder {
                initial: resolution.initial_backoff_ms,
                max,
            });
        }
        _ => {}
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
