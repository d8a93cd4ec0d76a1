use crate::domain::rate_limit::{Bucket, RateLimitConfig};

/// Supplies bucket thresholds.
///
/// Limiters call [`LimitSource::resolve`] on every check and never cache the
/// result, so operators can retune limits while the process is running.
pub trait LimitSource: Send + Sync {
    fn resolve(&self, bucket: Bucket) -> RateLimitConfig;
}
