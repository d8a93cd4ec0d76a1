//! Rate limiting port for protecting chat and API endpoints.
//!
//! Route handlers depend only on this trait. Implementations are the
//! in-process limiter (single server) and the Redis-backed limiter
//! (multiple servers sharing one counter store).

use async_trait::async_trait;

use crate::domain::rate_limit::{Bucket, RateLimitDecision, RateLimitStatus, SuspiciousActivity};

/// Port for rate limiting operations.
///
/// None of these methods fail: infrastructure problems resolve to an
/// allowing decision inside the implementation.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record an attempt by `client_id` against `bucket` and decide whether
    /// it may proceed.
    async fn check(&self, client_id: &str, bucket: Bucket) -> RateLimitDecision;

    /// Record an attempt and report the client's standing right after it.
    ///
    /// Backends that can read the standing from the same operation should
    /// override this.
    async fn check_with_status(&self, client_id: &str, bucket: Bucket) -> (RateLimitDecision, RateLimitStatus) {
        let decision = self.check(client_id, bucket).await;
        (decision, self.status(client_id, bucket).await)
    }

    /// Current standing of `client_id` in `bucket`, without recording an attempt.
    async fn status(&self, client_id: &str, bucket: Bucket) -> RateLimitStatus;

    /// Forget everything about `client_id` in `bucket` (admin operation).
    async fn reset(&self, client_id: &str, bucket: Bucket);

    /// Clients that have exhausted a bucket, most recent first.
    ///
    /// Backends that cannot enumerate their state report nothing.
    async fn suspicious_activity(&self) -> Vec<SuspiciousActivity> {
        Vec::new()
    }
}
