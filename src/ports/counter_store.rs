//! CounterStore port - shared atomic counters with expiry.
//!
//! The distributed limiter keeps no state of its own. Every decision hinges
//! on [`CounterStore::increment`] being a single atomic operation in the
//! store: two concurrent callers must never both observe the same count.

use async_trait::async_trait;
use std::time::Duration;

/// Counter value together with its remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub count: u64,
    pub ttl: Duration,
}

/// Port for an external atomic-counter store (Redis or compatible).
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key` and read its TTL.
    ///
    /// A counter without an expiry (i.e. on its first increment) gets
    /// `window` as its TTL within the same atomic unit.
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterSnapshot, CounterStoreError>;

    /// Read a counter without modifying it. `None` if the key does not exist.
    async fn snapshot(&self, key: &str) -> Result<Option<CounterSnapshot>, CounterStoreError>;

    /// Delete a counter.
    async fn delete(&self, key: &str) -> Result<(), CounterStoreError>;
}

/// Errors from the counter store.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    /// Store is unreachable or rejected the command.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// Store did not answer in time.
    #[error("counter store timed out after {0:?}")]
    Timeout(Duration),

    /// Store answered with something other than a counter.
    #[error("unexpected counter store reply: {0}")]
    UnexpectedReply(String),
}
