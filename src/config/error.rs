//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Bucket '{0}' must allow at least one attempt")]
    InvalidMaxAttempts(&'static str),

    #[error("Bucket '{0}' must have a window between 1 ms and 7 days")]
    InvalidWindow(&'static str),

    #[error("Block duration must not exceed 7 days")]
    InvalidBlockDuration,

    #[error("Cleanup interval must be greater than zero")]
    InvalidCleanupInterval,
}
