//! Rate limiter adapters.
//!
//! Implementations of the RateLimiter port for different backends.
//!
//! ## Available Adapters
//!
//! - `InMemoryRateLimiter` - fixed window with block period, single server
//! - `DistributedRateLimiter` - shared counters in a `CounterStore`
//! - `RedisCounterStore` / `InMemoryCounterStore` - counter stores
//! - `RateLimitService` - facade choosing a backend from configuration
//!
//! ## Usage
//!
//! ```ignore
//! use chat_throttle::adapters::rate_limiter::{LiveRateLimitSettings, RateLimitService};
//!
//! let settings = Arc::new(LiveRateLimitSettings::new(config.rate_limit.clone()));
//! let service = RateLimitService::from_config(&config, settings).await?;
//!
//! if service.check(client_ip, Bucket::Chat).await.is_denied() {
//!     // reject with 429
//! }
//! ```

mod cleanup;
mod counter_store;
mod distributed;
mod in_memory;
mod redis;
mod service;
mod settings;

pub use cleanup::{CleanupHandle, CleanupTask};
pub use counter_store::InMemoryCounterStore;
pub use distributed::{DistributedRateLimiter, DEFAULT_KEY_PREFIX};
pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisCounterStore;
pub use service::{Backend, RateLimitService, ServiceError};
pub use settings::LiveRateLimitSettings;
