//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `RateLimiter` - allow/deny decisions consumed by route handlers
//! - `CounterStore` - atomic counters with expiry (Redis)
//! - `LimitSource` - per-bucket thresholds, resolved on every check
//! - `Clock` - current time

mod clock;
mod counter_store;
mod limit_source;
mod rate_limiter;

pub use clock::Clock;
pub use counter_store::{CounterSnapshot, CounterStore, CounterStoreError};
pub use limit_source::LimitSource;
pub use rate_limiter::RateLimiter;
