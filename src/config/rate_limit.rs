//! Rate limiting configuration
//!
//! Per-bucket thresholds plus the backend selection flag. Every value can be
//! supplied through the environment, e.g.
//! `CHAT_THROTTLE__RATE_LIMIT__CHAT__MAX_ATTEMPTS=5`.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::rate_limit::{Bucket, RateLimitConfig};

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitSettings {
    /// Use the Redis-backed counter instead of the in-process limiter
    #[serde(default)]
    pub use_distributed_backend: bool,

    /// How long a client stays blocked after exhausting a bucket (milliseconds)
    #[serde(default = "default_block_duration_ms")]
    pub block_duration_ms: u64,

    /// Interval between sweeps of stale in-process entries (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Prefix for distributed counter keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Limits for the `default` bucket
    #[serde(default = "BucketLimits::default_bucket", deserialize_with = "default_limits")]
    pub default: BucketLimits,

    /// Limits for the `api` bucket
    #[serde(default = "BucketLimits::api_bucket", deserialize_with = "api_limits")]
    pub api: BucketLimits,

    /// Limits for the `chat` bucket
    #[serde(default = "BucketLimits::chat_bucket", deserialize_with = "chat_limits")]
    pub chat: BucketLimits,
}

/// Window and attempt budget for a single bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BucketLimits {
    /// Window length in milliseconds
    pub window_ms: u64,

    /// Attempts admitted per window
    pub max_attempts: u32,
}

impl BucketLimits {
    /// 100 requests per 15 minutes.
    pub fn default_bucket() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_attempts: 100,
        }
    }

    /// 60 requests per minute.
    pub fn api_bucket() -> Self {
        Self {
            window_ms: 60 * 1000,
            max_attempts: 60,
        }
    }

    /// 10 chat messages per minute.
    pub fn chat_bucket() -> Self {
        Self {
            window_ms: 60 * 1000,
            max_attempts: 10,
        }
    }

    fn validate(&self, bucket: Bucket) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts(bucket.as_str()));
        }
        if self.window_ms == 0 || self.window_ms > MAX_DURATION_MS {
            return Err(ValidationError::InvalidWindow(bucket.as_str()));
        }
        Ok(())
    }
}

/// Upper bound for windows and the block duration: 7 days.
pub const MAX_DURATION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// A bucket section where either field may be omitted.
#[derive(Deserialize)]
struct PartialBucketLimits {
    window_ms: Option<u64>,
    max_attempts: Option<u32>,
}

impl PartialBucketLimits {
    fn or(self, fallback: BucketLimits) -> BucketLimits {
        BucketLimits {
            window_ms: self.window_ms.unwrap_or(fallback.window_ms),
            max_attempts: self.max_attempts.unwrap_or(fallback.max_attempts),
        }
    }
}

fn default_limits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BucketLimits, D::Error> {
    PartialBucketLimits::deserialize(deserializer).map(|p| p.or(BucketLimits::default_bucket()))
}

fn api_limits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BucketLimits, D::Error> {
    PartialBucketLimits::deserialize(deserializer).map(|p| p.or(BucketLimits::api_bucket()))
}

fn chat_limits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BucketLimits, D::Error> {
    PartialBucketLimits::deserialize(deserializer).map(|p| p.or(BucketLimits::chat_bucket()))
}

impl RateLimitSettings {
    /// Limits configured for a bucket.
    pub fn bucket_limits(&self, bucket: Bucket) -> BucketLimits {
        match bucket {
            Bucket::Default => self.default,
            Bucket::Api => self.api,
            Bucket::Chat => self.chat,
        }
    }

    /// Resolve the effective configuration for a bucket.
    pub fn limits_for(&self, bucket: Bucket) -> RateLimitConfig {
        let limits = self.bucket_limits(bucket);
        RateLimitConfig {
            window: Duration::from_millis(limits.window_ms),
            max_attempts: limits.max_attempts,
            block_duration: self.block_duration(),
        }
    }

    /// Get block duration as Duration
    pub fn block_duration(&self) -> Duration {
        Duration::from_millis(self.block_duration_ms)
    }

    /// Get cleanup interval as Duration
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Validate rate limiting configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for bucket in Bucket::ALL {
            self.bucket_limits(bucket).validate(bucket)?;
        }
        if self.block_duration_ms > MAX_DURATION_MS {
            return Err(ValidationError::InvalidBlockDuration);
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ValidationError::InvalidCleanupInterval);
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            use_distributed_backend: false,
            block_duration_ms: default_block_duration_ms(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            key_prefix: default_key_prefix(),
            default: BucketLimits::default_bucket(),
            api: BucketLimits::api_bucket(),
            chat: BucketLimits::chat_bucket(),
        }
    }
}

fn default_block_duration_ms() -> u64 {
    15 * 60 * 1000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "chat_throttle:".to_string()
}
