//! In-memory rate limiter for single-server deployments.
//!
//! Fixed window with a block period: once a client spends its attempt
//! budget it stays blocked until `reset_at + block_duration`, even after the
//! window itself has closed. Not shared between processes.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapters::clock::SystemClock;
use crate::config::Environment;
use crate::domain::foundation::Timestamp;
use crate::domain::rate_limit::{
    ceil_secs, fingerprint, Bucket, ExemptionPolicy, Fingerprint, RateLimitConfig,
    RateLimitDecision, RateLimitEntry, RateLimitStatus, SuspiciousActivity,
};
use crate::ports::{Clock, LimitSource, RateLimiter};

type EntryMap = HashMap<Fingerprint, RateLimitEntry>;

/// One independently locked map per bucket.
#[derive(Debug, Default)]
struct BucketMaps {
    default: RwLock<EntryMap>,
    api: RwLock<EntryMap>,
    chat: RwLock<EntryMap>,
}

impl BucketMaps {
    fn get(&self, bucket: Bucket) -> &RwLock<EntryMap> {
        match bucket {
            Bucket::Default => &self.default,
            Bucket::Api => &self.api,
            Bucket::Chat => &self.chat,
        }
    }
}

/// In-memory rate limiter keyed by client fingerprint.
///
/// Every operation holds its bucket's lock for the whole read-modify-write,
/// so checks, status reads and the cleanup sweep never interleave partially.
pub struct InMemoryRateLimiter {
    entries: BucketMaps,
    limits: Arc<dyn LimitSource>,
    exemptions: ExemptionPolicy,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Create a limiter reading thresholds from `limits`.
    pub fn new(limits: Arc<dyn LimitSource>, environment: Environment) -> Self {
        Self {
            entries: BucketMaps::default(),
            limits,
            exemptions: ExemptionPolicy::new(environment),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Remove every entry whose block period has fully elapsed.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        for bucket in Bucket::ALL {
            let limits = self.limits.resolve(bucket);
            let mut entries = self.entries.get(bucket).write().await;
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_stale(now, &limits));
            removed += before - entries.len();
        }

        if removed > 0 {
            tracing::debug!(removed, "swept stale rate limit entries");
        }
        removed
    }

    /// Number of tracked clients in a bucket.
    pub async fn tracked_clients(&self, bucket: Bucket) -> usize {
        self.entries.get(bucket).read().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, client_id: &str, bucket: Bucket) -> RateLimitDecision {
        self.check_with_status(client_id, bucket).await.0
    }

    async fn check_with_status(&self, client_id: &str, bucket: Bucket) -> (RateLimitDecision, RateLimitStatus) {
        let limits = self.limits.resolve(bucket);
        let now = self.clock.now();

        if self.exemptions.is_exempt(client_id) {
            let status = RateLimitStatus::new(0, limits.max_attempts, now.plus(limits.window));
            return (RateLimitDecision::Allowed, status);
        }

        let key = fingerprint(client_id);
        let mut entries = self.entries.get(bucket).write().await;
        let (decision, entry) = match entries.entry(key.clone()) {
            Entry::Vacant(vacant) => (
                RateLimitDecision::Allowed,
                vacant.insert(RateLimitEntry::start(now, limits.window)),
            ),
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                (advance(entry, now, &limits, bucket, &key), entry)
            }
        };

        let status = RateLimitStatus::new(entry.count(), limits.max_attempts, entry.reset_at());
        (decision, status)
    }

    async fn status(&self, client_id: &str, bucket: Bucket) -> RateLimitStatus {
        let limits = self.limits.resolve(bucket);
        let key = fingerprint(client_id);
        let now = self.clock.now();

        let entries = self.entries.get(bucket).read().await;
        match entries.get(&key).filter(|entry| entry.is_live(now, &limits)) {
            Some(entry) => RateLimitStatus::new(entry.count(), limits.max_attempts, entry.reset_at()),
            None => RateLimitStatus::new(0, limits.max_attempts, now.plus(limits.window)),
        }
    }

    async fn reset(&self, client_id: &str, bucket: Bucket) {
        let key = fingerprint(client_id);
        if self.entries.get(bucket).write().await.remove(&key).is_some() {
            tracing::info!(%bucket, client = key.short(), "rate limit entry reset");
        }
    }

    async fn suspicious_activity(&self) -> Vec<SuspiciousActivity> {
        let mut report = Vec::new();

        for bucket in Bucket::ALL {
            let limits = self.limits.resolve(bucket);
            let entries = self.entries.get(bucket).read().await;
            report.extend(
                entries
                    .iter()
                    .filter(|(_, entry)| entry.is_exhausted(&limits))
                    .filter_map(|(key, entry)| {
                        Some(SuspiciousActivity {
                            bucket,
                            fingerprint: key.clone(),
                            attempts: entry.count(),
                            last_attempt: entry.last_attempt()?,
                        })
                    }),
            );
        }

        report.sort_by(|a, b| b.last_attempt.cmp(&a.last_attempt));
        report
    }
}

/// Apply one attempt to an existing entry.
fn advance(
    entry: &mut RateLimitEntry,
    now: Timestamp,
    limits: &RateLimitConfig,
    bucket: Bucket,
    key: &Fingerprint,
) -> RateLimitDecision {
    if entry.is_exhausted(limits) {
        let unblock_at = entry.unblock_at(limits);
        if now.is_before(&unblock_at) {
            let retry_after_secs = ceil_secs(now.millis_until(&unblock_at));
            tracing::warn!(
                %bucket,
                client = key.short(),
                retry_after_secs,
                "rate limit exceeded"
            );
            return RateLimitDecision::denied(retry_after_secs);
        }
        *entry = RateLimitEntry::start(now, limits.window);
        return RateLimitDecision::Allowed;
    }

    if now.is_after(&entry.reset_at()) {
        *entry = RateLimitEntry::start(now, limits.window);
        return RateLimitDecision::Allowed;
    }

    entry.record_attempt(now, limits.window);
    if entry.count() <= limits.max_attempts {
        RateLimitDecision::Allowed
    } else {
        RateLimitDecision::denied(ceil_secs(now.millis_until(&entry.unblock_at(limits))))
    }
}

impl std::fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRateLimiter")
            .field("exemptions", &self.exemptions)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::rate_limiter::LiveRateLimitSettings;
    use crate::config::{BucketLimits, RateLimitSettings};
    use std::time::Duration;

    const CLIENT: &str = "203.0.113.7";

    fn chat_settings() -> RateLimitSettings {
        RateLimitSettings {
            block_duration_ms: 300_000,
            chat: BucketLimits {
                window_ms: 60_000,
                max_attempts: 5,
            },
            api: BucketLimits {
                window_ms: 60_000,
                max_attempts: 2,
            },
            ..Default::default()
        }
    }

    fn test_limiter(environment: Environment) -> (InMemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at_epoch_millis(1_700_000_000_000));
        let settings = Arc::new(LiveRateLimitSettings::new(chat_settings()));
        let limiter = InMemoryRateLimiter::new(settings, environment).with_clock(clock.clone());
        (limiter, clock)
    }

    async fn exhaust(limiter: &InMemoryRateLimiter, client: &str, bucket: Bucket, times: u32) {
        for i in 0..times {
            assert!(
                limiter.check(client, bucket).await.is_allowed(),
                "Request {} should be allowed",
                i + 1
            );
        }
    }

    // ─── Basic Functionality Tests ───────────────────────────────────

    #[tokio::test]
    async fn first_request_is_allowed() {
        let (limiter, _) = test_limiter(Environment::Development);
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_allowed());
    }

    #[tokio::test]
    async fn admits_exactly_max_attempts_then_denies() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Chat, 5).await;

        let decision = limiter.check(CLIENT, Bucket::Chat).await;
        assert!(decision.is_denied());
        let retry = decision.retry_after_secs().unwrap();
        // window (60s) + block (300s) measured from the first attempt
        assert_eq!(retry, 360);
    }

    #[tokio::test]
    async fn denial_does_not_inflate_count() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Chat, 5).await;
        for _ in 0..3 {
            assert!(limiter.check(CLIENT, Bucket::Chat).await.is_denied());
        }

        let status = limiter.status(CLIENT, Bucket::Chat).await;
        assert_eq!(status.count, 5);
        assert_eq!(status.remaining, 0);
    }

    #[tokio::test]
    async fn stays_blocked_after_window_until_block_elapses() {
        let (limiter, clock) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Chat, 5).await;

        clock.advance(Duration::from_secs(120));
        let decision = limiter.check(CLIENT, Bucket::Chat).await;
        assert_eq!(decision.retry_after_secs(), Some(240));

        clock.advance(Duration::from_secs(240));
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_allowed());
        assert_eq!(limiter.status(CLIENT, Bucket::Chat).await.count, 1);
    }

    #[tokio::test]
    async fn window_expiry_resets_unexhausted_counter() {
        let (limiter, clock) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Chat, 3).await;

        clock.advance(Duration::from_millis(60_001));
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_allowed());
        assert_eq!(limiter.status(CLIENT, Bucket::Chat).await.count, 1);
    }

    // ─── Status Tests ─────────────────────────────────────────────────

    #[tokio::test]
    async fn status_for_unknown_client_reports_full_quota() {
        let (limiter, clock) = test_limiter(Environment::Development);
        let status = limiter.status(CLIENT, Bucket::Chat).await;

        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 5);
        assert_eq!(status.reset_at, clock.now().plus(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn status_does_not_consume_attempts() {
        let (limiter, _) = test_limiter(Environment::Development);
        limiter.check(CLIENT, Bucket::Chat).await;
        for _ in 0..10 {
            limiter.status(CLIENT, Bucket::Chat).await;
        }

        let status = limiter.status(CLIENT, Bucket::Chat).await;
        assert_eq!(status.count, 1);
        assert_eq!(status.remaining, 4);
    }

    #[tokio::test]
    async fn status_treats_expired_window_as_empty() {
        let (limiter, clock) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Chat, 2).await;
        clock.advance(Duration::from_secs(61));

        let status = limiter.status(CLIENT, Bucket::Chat).await;
        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 5);
    }

    // ─── Isolation Tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn buckets_are_independent() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Api, 2).await;
        assert!(limiter.check(CLIENT, Bucket::Api).await.is_denied());

        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_allowed());
        assert!(limiter.check(CLIENT, Bucket::Default).await.is_allowed());
    }

    #[tokio::test]
    async fn different_clients_have_independent_limits() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, "1.1.1.1", Bucket::Api, 2).await;
        assert!(limiter.check("1.1.1.1", Bucket::Api).await.is_denied());

        assert!(limiter.check("2.2.2.2", Bucket::Api).await.is_allowed());
    }

    #[tokio::test]
    async fn anonymous_clients_share_one_budget() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, "", Bucket::Api, 1).await;
        exhaust(&limiter, "anonymous", Bucket::Api, 1).await;
        assert!(limiter.check("", Bucket::Api).await.is_denied());
    }

    // ─── Exemption Tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn exempt_clients_are_never_limited_outside_production() {
        let (limiter, _) = test_limiter(Environment::Development);
        for _ in 0..50 {
            assert!(limiter.check("127.0.0.1", Bucket::Api).await.is_allowed());
            assert!(limiter.check("10.1.2.3", Bucket::Api).await.is_allowed());
        }
        assert_eq!(limiter.tracked_clients(Bucket::Api).await, 0);
    }

    #[tokio::test]
    async fn exempt_clients_are_limited_in_production() {
        let (limiter, _) = test_limiter(Environment::Production);
        exhaust(&limiter, "127.0.0.1", Bucket::Api, 2).await;
        assert!(limiter.check("127.0.0.1", Bucket::Api).await.is_denied());
    }

    // ─── Reset and Cleanup Tests ──────────────────────────────────────

    #[tokio::test]
    async fn reset_clears_block() {
        let (limiter, _) = test_limiter(Environment::Development);
        exhaust(&limiter, CLIENT, Bucket::Api, 2).await;
        assert!(limiter.check(CLIENT, Bucket::Api).await.is_denied());

        limiter.reset(CLIENT, Bucket::Api).await;
        assert!(limiter.check(CLIENT, Bucket::Api).await.is_allowed());
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_entries() {
        let (limiter, clock) = test_limiter(Environment::Development);
        limiter.check("198.51.100.1", Bucket::Chat).await;

        clock.advance(Duration::from_secs(200));
        exhaust(&limiter, CLIENT, Bucket::Chat, 5).await;

        // first entry: window ended at 60s, block at 360s
        clock.advance(Duration::from_secs(161));
        assert_eq!(limiter.cleanup().await, 1);
        assert_eq!(limiter.tracked_clients(Bucket::Chat).await, 1);
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_denied());
    }

    // ─── Combined Check and Status Tests ──────────────────────────────

    #[tokio::test]
    async fn check_with_status_reports_standing_after_the_attempt() {
        let (limiter, clock) = test_limiter(Environment::Production);
        let (decision, status) = limiter.check_with_status(CLIENT, Bucket::Chat).await;
        assert!(decision.is_allowed());
        assert_eq!(status.count, 1);
        assert_eq!(status.remaining, 4);
        assert_eq!(status.reset_at, clock.now().plus(Duration::from_secs(60)));

        exhaust(&limiter, CLIENT, Bucket::Chat, 4).await;
        let (decision, status) = limiter.check_with_status(CLIENT, Bucket::Chat).await;
        assert!(decision.is_denied());
        assert_eq!(status.count, 5);
        assert_eq!(status.limit, 5);
        assert_eq!(status.remaining, 0);
    }

    #[tokio::test]
    async fn check_with_status_for_exempt_client_reports_full_quota() {
        let (limiter, _) = test_limiter(Environment::Development);
        let (decision, status) = limiter.check_with_status("127.0.0.1", Bucket::Chat).await;
        assert!(decision.is_allowed());
        assert_eq!(status.count, 0);
        assert_eq!(status.remaining, 5);
    }

    // ─── Extreme Configuration Tests ──────────────────────────────────

    #[tokio::test]
    async fn huge_window_still_blocks_second_attempt() {
        // replace() would reject this; new() does not validate
        let settings = Arc::new(LiveRateLimitSettings::new(RateLimitSettings {
            chat: BucketLimits {
                window_ms: 10_000_000_000_000_000,
                max_attempts: 1,
            },
            ..Default::default()
        }));
        let clock = Arc::new(ManualClock::starting_at_epoch_millis(1_700_000_000_000));
        let limiter = InMemoryRateLimiter::new(settings, Environment::Production).with_clock(clock.clone());

        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_allowed());
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_denied());

        clock.advance(Duration::from_secs(86_400));
        assert!(limiter.check(CLIENT, Bucket::Chat).await.is_denied());
    }

    // ─── Observability Tests ──────────────────────────────────────────

    #[tokio::test]
    async fn suspicious_activity_lists_exhausted_clients_newest_first() {
        let (limiter, clock) = test_limiter(Environment::Development);
        exhaust(&limiter, "198.51.100.1", Bucket::Api, 2).await;
        clock.advance(Duration::from_secs(1));
        exhaust(&limiter, CLIENT, Bucket::Chat, 5).await;
        limiter.check("198.51.100.99", Bucket::Chat).await;

        let report = limiter.suspicious_activity().await;
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].bucket, Bucket::Chat);
        assert_eq!(report[0].fingerprint, fingerprint(CLIENT));
        assert_eq!(report[0].attempts, 5);
        assert_eq!(report[1].bucket, Bucket::Api);
        assert!(report[0].last_attempt.is_after(&report[1].last_attempt));
    }
}
