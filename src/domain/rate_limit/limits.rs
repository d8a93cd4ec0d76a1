use std::time::Duration;

/// Effective thresholds for one bucket, resolved fresh on every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of the counting window.
    pub window: Duration,
    /// Attempts admitted per window.
    pub max_attempts: u32,
    /// Extra time a client stays blocked after exhausting the window.
    pub block_duration: Duration,
}

/// Whole seconds needed to cover `millis`, rounded up.
pub(crate) fn ceil_secs(millis: i64) -> u64 {
    let millis = u64::try_from(millis).unwrap_or(0);
    (millis + 999) / 1000
}
