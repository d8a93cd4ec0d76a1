//! Rate limit facade used by the HTTP layer.
//!
//! Picks the backend from configuration once at startup and forwards every
//! call to it. Handlers never need to know which backend is active.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    CleanupHandle, CleanupTask, DistributedRateLimiter, InMemoryRateLimiter, LiveRateLimitSettings,
    RedisCounterStore,
};
use crate::config::{AppConfig, Environment, ValidationError};
use crate::domain::rate_limit::{Bucket, RateLimitDecision, RateLimitStatus, SuspiciousActivity};
use crate::ports::{CounterStore, CounterStoreError, RateLimiter};

/// Which backend a [`RateLimitService`] delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Distributed,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Distributed => "distributed",
        }
    }
}

/// Errors raised while assembling the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("could not reach counter store: {0}")]
    Store(#[from] CounterStoreError),
}

/// Single entry point for rate limiting.
pub struct RateLimitService {
    limiter: Arc<dyn RateLimiter>,
    backend: Backend,
    cleanup: Mutex<Option<CleanupHandle>>,
}

impl RateLimitService {
    /// Build the backend selected by `config.rate_limit.use_distributed_backend`.
    ///
    /// The local backend starts its cleanup sweep immediately; the
    /// distributed backend connects to Redis before returning.
    pub async fn from_config(
        config: &AppConfig,
        settings: Arc<LiveRateLimitSettings>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let environment = config.server.environment;

        if config.rate_limit.use_distributed_backend {
            let store = RedisCounterStore::connect(&config.redis).await?;
            Ok(Self::distributed(
                Arc::new(store),
                settings,
                environment,
                config.rate_limit.key_prefix.clone(),
            ))
        } else {
            Ok(Self::local(settings, environment))
        }
    }

    /// In-process backend with a running cleanup sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn local(settings: Arc<LiveRateLimitSettings>, environment: Environment) -> Self {
        let interval = settings.snapshot().cleanup_interval();
        let limiter = Arc::new(InMemoryRateLimiter::new(settings, environment));
        let cleanup = CleanupTask::new(limiter.clone(), interval).spawn();

        tracing::info!(backend = "local", "rate limiting enabled");
        Self {
            limiter,
            backend: Backend::Local,
            cleanup: Mutex::new(Some(cleanup)),
        }
    }

    /// Backend sharing counters through `store`.
    pub fn distributed(
        store: Arc<dyn CounterStore>,
        settings: Arc<LiveRateLimitSettings>,
        environment: Environment,
        key_prefix: String,
    ) -> Self {
        let limiter = DistributedRateLimiter::new(store, settings, environment).with_key_prefix(key_prefix);

        tracing::info!(backend = "distributed", "rate limiting enabled");
        Self {
            limiter: Arc::new(limiter),
            backend: Backend::Distributed,
            cleanup: Mutex::new(None),
        }
    }

    /// Wrap an arbitrary limiter, e.g. one built with a manual clock.
    pub fn with_limiter(limiter: Arc<dyn RateLimiter>, backend: Backend) -> Self {
        Self {
            limiter,
            backend,
            cleanup: Mutex::new(None),
        }
    }

    pub async fn check(&self, client_id: &str, bucket: Bucket) -> RateLimitDecision {
        self.limiter.check(client_id, bucket).await
    }

    /// Record an attempt and return the resulting standing in one call.
    pub async fn check_with_status(&self, client_id: &str, bucket: Bucket) -> (RateLimitDecision, RateLimitStatus) {
        self.limiter.check_with_status(client_id, bucket).await
    }

    pub async fn status(&self, client_id: &str, bucket: Bucket) -> RateLimitStatus {
        self.limiter.status(client_id, bucket).await
    }

    pub async fn reset(&self, client_id: &str, bucket: Bucket) {
        self.limiter.reset(client_id, bucket).await
    }

    pub async fn suspicious_activity(&self) -> Vec<SuspiciousActivity> {
        self.limiter.suspicious_activity().await
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        self.limiter.clone()
    }

    /// Stop background work. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.cleanup.lock().await.take() {
            handle.stop().await;
            tracing::info!("rate limit service stopped");
        }
    }
}

impl std::fmt::Debug for RateLimitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitService")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rate_limiter::InMemoryCounterStore;
    use crate::config::RateLimitSettings;

    #[tokio::test]
    async fn from_config_defaults_to_local_backend() {
        let config = AppConfig::default();
        let service = RateLimitService::from_config(&config, Arc::new(LiveRateLimitSettings::default()))
            .await
            .unwrap();

        assert_eq!(service.backend(), Backend::Local);
        assert!(service.check("203.0.113.7", Bucket::Chat).await.is_allowed());
        service.shutdown().await;
        service.shutdown().await;
    }

    #[tokio::test]
    async fn from_config_rejects_distributed_without_redis_url() {
        let mut config = AppConfig::default();
        config.rate_limit.use_distributed_backend = true;
        config.redis.url = String::new();

        let result = RateLimitService::from_config(&config, Arc::new(LiveRateLimitSettings::default())).await;
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[tokio::test]
    async fn distributed_facade_delegates_to_store() {
        let settings = Arc::new(LiveRateLimitSettings::new(RateLimitSettings::default()));
        let service = RateLimitService::distributed(
            Arc::new(InMemoryCounterStore::new()),
            settings,
            Environment::Production,
            "test:".to_string(),
        );
        assert_eq!(service.backend(), Backend::Distributed);

        for _ in 0..10 {
            assert!(service.check("203.0.113.7", Bucket::Chat).await.is_allowed());
        }
        assert!(service.check("203.0.113.7", Bucket::Chat).await.is_denied());
        assert_eq!(service.status("203.0.113.7", Bucket::Chat).await.count, 11);

        service.reset("203.0.113.7", Bucket::Chat).await;
        assert_eq!(service.status("203.0.113.7", Bucket::Chat).await.count, 0);
    }

    #[test]
    fn backend_names() {
        assert_eq!(Backend::Local.as_str(), "local");
        assert_eq!(Backend::Distributed.as_str(), "distributed");
    }
}
