//! Live, operator-tunable bucket thresholds.

use std::sync::{PoisonError, RwLock};

use crate::config::{AppConfig, ConfigError, RateLimitSettings, ValidationError};
use crate::domain::rate_limit::{Bucket, RateLimitConfig};
use crate::ports::LimitSource;

/// Holds the current [`RateLimitSettings`] and resolves buckets against them
/// on every call.
///
/// Replacing the settings takes effect on the very next check; limiter state
/// (counters, entries) is untouched.
#[derive(Debug)]
pub struct LiveRateLimitSettings {
    current: RwLock<RateLimitSettings>,
}

impl LiveRateLimitSettings {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    /// Copy of the settings in effect right now.
    pub fn snapshot(&self) -> RateLimitSettings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in new settings after validating them.
    pub fn replace(&self, settings: RateLimitSettings) -> Result<(), ValidationError> {
        settings.validate()?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
        tracing::info!("rate limit settings replaced");
        Ok(())
    }

    /// Re-read the `rate_limit` section from the environment, layered over
    /// the `CHAT_THROTTLE_CONFIG` file when one is named.
    ///
    /// Invalid settings are rejected and the current ones stay in effect.
    pub fn reload_from_env(&self) -> Result<(), ConfigError> {
        let config = AppConfig::load_configured()?;
        self.replace(config.rate_limit)?;
        Ok(())
    }
}

impl Default for LiveRateLimitSettings {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}

impl LimitSource for LiveRateLimitSettings {
    fn resolve(&self, bucket: Bucket) -> RateLimitConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .limits_for(bucket)
    }
}
