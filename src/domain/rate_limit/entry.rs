//! Per-client state for the in-process fixed-window-with-block algorithm.

use std::collections::VecDeque;
use std::time::Duration;

use super::RateLimitConfig;
use crate::domain::foundation::Timestamp;

/// Attempt history for one fingerprint within one bucket.
///
/// `count` only grows within a window. Once it reaches the bucket's
/// `max_attempts` the entry is blocked until `reset_at + block_duration`,
/// after which it is replaced by a fresh entry rather than mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    count: u32,
    reset_at: Timestamp,
    attempts: VecDeque<Timestamp>,
}

impl RateLimitEntry {
    /// A fresh entry holding a single attempt at `now`.
    pub fn start(now: Timestamp, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now.plus(window),
            attempts: VecDeque::from([now]),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// End of the counting window.
    pub fn reset_at(&self) -> Timestamp {
        self.reset_at
    }

    /// Attempt timestamps still inside the window, oldest first.
    pub fn attempts(&self) -> impl Iterator<Item = &Timestamp> {
        self.attempts.iter()
    }

    pub fn last_attempt(&self) -> Option<Timestamp> {
        self.attempts.back().copied()
    }

    /// True once the attempt budget is spent.
    pub fn is_exhausted(&self, limits: &RateLimitConfig) -> bool {
        self.count >= limits.max_attempts
    }

    /// When an exhausted entry stops blocking.
    pub fn unblock_at(&self, limits: &RateLimitConfig) -> Timestamp {
        self.reset_at.plus(limits.block_duration)
    }

    /// True while the entry still governs the client's next request.
    ///
    /// Exhausted entries stay live through the block period; others only
    /// until the window closes.
    pub fn is_live(&self, now: Timestamp, limits: &RateLimitConfig) -> bool {
        if self.is_exhausted(limits) {
            now.is_before(&self.unblock_at(limits))
        } else {
            !now.is_after(&self.reset_at)
        }
    }

    /// Eligible for the background sweep.
    pub fn is_stale(&self, now: Timestamp, limits: &RateLimitConfig) -> bool {
        now.is_after(&self.unblock_at(limits))
    }

    /// Count another attempt and drop history older than the window.
    pub fn record_attempt(&mut self, now: Timestamp, window: Duration) {
        self.count = self.count.saturating_add(1);
        self.attempts.push_back(now);

        let horizon = now.minus(window);
        while self
            .attempts
            .front()
            .is_some_and(|oldest| !oldest.is_after(&horizon))
        {
            self.attempts.pop_front();
        }
    }
}
