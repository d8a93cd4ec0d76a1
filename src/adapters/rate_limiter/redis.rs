//! Redis-backed counter store for multi-server deployments.
//!
//! Increment, TTL read and first-hit expiry run inside one Lua script, so
//! Redis executes them as a single operation.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError, RedisResult, Script};
use std::future::Future;
use std::time::Duration;

use crate::config::RedisConfig;
use crate::ports::{CounterSnapshot, CounterStore, CounterStoreError};

const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// [`CounterStore`] backed by a Redis multiplexed connection.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
    script: Script,
    timeout: Duration,
}

impl RedisCounterStore {
    /// Wrap an existing connection.
    pub fn new(conn: MultiplexedConnection, timeout: Duration) -> Self {
        Self {
            conn,
            script: Script::new(INCREMENT_SCRIPT),
            timeout,
        }
    }

    /// Open a connection using the application's Redis configuration.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(config.url.as_str()).map_err(unavailable)?;
        let conn = tokio::time::timeout(config.timeout(), client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| CounterStoreError::Timeout(config.timeout()))?
            .map_err(unavailable)?;

        tracing::info!("connected to redis counter store");
        Ok(Self::new(conn, config.timeout()))
    }

    async fn bounded<T>(&self, command: impl Future<Output = RedisResult<T>>) -> Result<T, CounterStoreError> {
        tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| CounterStoreError::Timeout(self.timeout))?
            .map_err(unavailable)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<CounterSnapshot, CounterStoreError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let mut conn = self.conn.clone();
        let mut invocation = self.script.prepare_invoke();
        invocation.key(key).arg(window_ms);

        let (count, ttl_ms): (i64, i64) = self.bounded(invocation.invoke_async(&mut conn)).await?;
        snapshot_from(count, ttl_ms)
    }

    async fn snapshot(&self, key: &str) -> Result<Option<CounterSnapshot>, CounterStoreError> {
        let mut conn = self.conn.clone();
        let pipeline = redis::pipe().atomic().get(key).pttl(key).to_owned();

        let (count, ttl_ms): (Option<i64>, i64) = self.bounded(pipeline.query_async(&mut conn)).await?;
        // PTTL -2: key does not exist
        match count {
            Some(count) if ttl_ms != -2 => snapshot_from(count, ttl_ms).map(Some),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CounterStoreError> {
        let mut conn = self.conn.clone();
        self.bounded(conn.del::<_, ()>(key)).await
    }
}

fn snapshot_from(count: i64, ttl_ms: i64) -> Result<CounterSnapshot, CounterStoreError> {
    let count = u64::try_from(count)
        .map_err(|_| CounterStoreError::UnexpectedReply(format!("negative counter {count}")))?;
    // -1 means no expiry; report zero rather than inventing one
    let ttl = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0));
    Ok(CounterSnapshot { count, ttl })
}

fn unavailable(e: RedisError) -> CounterStoreError {
    CounterStoreError::Unavailable(e.to_string())
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
