//! Distributed rate limiter over a shared counter store.
//!
//! Every server increments the same key, so the budget is enforced across
//! the whole fleet. There is no separate block period: a client is denied
//! until its counter's TTL runs out. When the store cannot be reached the
//! request is allowed.

use async_trait::async_trait;
use std::sync::Arc;

use crate::adapters::clock::SystemClock;
use crate::config::Environment;
use crate::domain::rate_limit::{
    ceil_secs, fingerprint, Bucket, ExemptionPolicy, RateLimitDecision, RateLimitStatus,
};
use crate::ports::{Clock, CounterStore, CounterStoreError, LimitSource, RateLimiter};

/// Prefix applied to counter keys when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "chat_throttle:";

/// Rate limiter whose state lives entirely in a [`CounterStore`].
pub struct DistributedRateLimiter {
    store: Arc<dyn CounterStore>,
    limits: Arc<dyn LimitSource>,
    exemptions: ExemptionPolicy,
    clock: Arc<dyn Clock>,
    key_prefix: String,
}

impl DistributedRateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        limits: Arc<dyn LimitSource>,
        environment: Environment,
    ) -> Self {
        Self {
            store,
            limits,
            exemptions: ExemptionPolicy::new(environment),
            clock: Arc::new(SystemClock),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Store key for a client in a bucket: `{prefix}{bucket}:{fingerprint}`.
    pub fn key_for(&self, client_id: &str, bucket: Bucket) -> String {
        format!("{}{}:{}", self.key_prefix, bucket, fingerprint(client_id))
    }

    fn log_store_failure(&self, operation: &'static str, bucket: Bucket, error: &CounterStoreError) {
        if self.exemptions.environment().is_production() {
            tracing::warn!(%bucket, operation, "counter store failed, allowing request");
        } else {
            tracing::warn!(%bucket, operation, error = %error, "counter store failed, allowing request");
        }
    }
}

#[async_trait]
impl RateLimiter for DistributedRateLimiter {
    async fn check(&self, client_id: &str, bucket: Bucket) -> RateLimitDecision {
        self.check_with_status(client_id, bucket).await.0
    }

    async fn check_with_status(&self, client_id: &str, bucket: Bucket) -> (RateLimitDecision, RateLimitStatus) {
        let limits = self.limits.resolve(bucket);
        let now = self.clock.now();
        let untouched = RateLimitStatus::new(0, limits.max_attempts, now.plus(limits.window));

        if self.exemptions.is_exempt(client_id) {
            return (RateLimitDecision::Allowed, untouched);
        }

        let key = self.key_for(client_id, bucket);
        let snapshot = match self.store.increment(&key, limits.window).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.log_store_failure("check", bucket, &e);
                return (RateLimitDecision::Allowed, untouched);
            }
        };

        let count = u32::try_from(snapshot.count).unwrap_or(u32::MAX);
        let status = RateLimitStatus::new(count, limits.max_attempts, now.plus(snapshot.ttl));
        if snapshot.count <= u64::from(limits.max_attempts) {
            return (RateLimitDecision::Allowed, status);
        }

        let ttl_ms = i64::try_from(snapshot.ttl.as_millis()).unwrap_or(i64::MAX);
        let retry_after_secs = ceil_secs(ttl_ms);
        tracing::warn!(%bucket, count = snapshot.count, retry_after_secs, "rate limit exceeded");
        (RateLimitDecision::denied(retry_after_secs), status)
    }

    async fn status(&self, client_id: &str, bucket: Bucket) -> RateLimitStatus {
        let limits = self.limits.resolve(bucket);
        let key = self.key_for(client_id, bucket);
        let now = self.clock.now();

        match self.store.snapshot(&key).await {
            Ok(Some(snapshot)) => {
                let count = u32::try_from(snapshot.count).unwrap_or(u32::MAX);
                RateLimitStatus::new(count, limits.max_attempts, now.plus(snapshot.ttl))
            }
            Ok(None) => RateLimitStatus::new(0, limits.max_attempts, now.plus(limits.window)),
            Err(e) => {
                self.log_store_failure("status", bucket, &e);
                RateLimitStatus::new(0, limits.max_attempts, now.plus(limits.window))
            }
        }
    }

    async fn reset(&self, client_id: &str, bucket: Bucket) {
        let key = self.key_for(client_id, bucket);
        match self.store.delete(&key).await {
            Ok(()) => tracing::info!(%bucket, "rate limit counter reset"),
            Err(e) => self.log_store_failure("reset", bucket, &e),
        }
    }
}

impl std::fmt::Debug for DistributedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedRateLimiter")
            .field("key_prefix", &self.key_prefix)
            .field("exemptions", &self.exemptions)
            .finish_non_exhaustive()
    }
}
