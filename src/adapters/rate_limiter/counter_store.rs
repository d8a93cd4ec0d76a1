//! In-memory counter store for development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::Timestamp;
use crate::ports::{Clock, CounterSnapshot, CounterStore, CounterStoreError};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    expires_at: Timestamp,
}

/// Process-local [`CounterStore`] with Redis-like expiry semantics.
///
/// A single mutex serializes every operation, which gives the same
/// atomicity guarantee the Redis script provides.
#[derive(Debug)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn ttl(now: Timestamp, counter: &Counter) -> Duration {
        let millis = now.millis_until(&counter.expires_at);
        Duration::from_millis(u64::try_from(millis).unwrap_or(0))
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterSnapshot, CounterStoreError> {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;

        let counter = counters
            .entry(key.to_string())
            .and_modify(|counter| {
                if !now.is_before(&counter.expires_at) {
                    *counter = Counter {
                        count: 0,
                        expires_at: now.plus(window),
                    };
                }
            })
            .or_insert(Counter {
                count: 0,
                expires_at: now.plus(window),
            });
        counter.count += 1;

        Ok(CounterSnapshot {
            count: counter.count,
            ttl: Self::ttl(now, counter),
        })
    }

    async fn snapshot(&self, key: &str) -> Result<Option<CounterSnapshot>, CounterStoreError> {
        let now = self.clock.now();
        let counters = self.counters.lock().await;

        Ok(counters
            .get(key)
            .filter(|counter| now.is_before(&counter.expires_at))
            .map(|counter| CounterSnapshot {
                count: counter.count,
                ttl: Self::ttl(now, counter),
            }))
    }

    async fn delete(&self, key: &str) -> Result<(), CounterStoreError> {
        self.counters.lock().await.remove(key);
        Ok(())
    }
}
