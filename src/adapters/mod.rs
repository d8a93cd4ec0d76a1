//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `rate_limiter` - In-memory and Redis-backed limiters, plus the facade
//! - `http` - axum middleware and routes
//! - `clock` - System and manual time sources

pub mod clock;
pub mod http;
pub mod rate_limiter;

pub use clock::{ManualClock, SystemClock};
pub use rate_limiter::{RateLimitService, LiveRateLimitSettings};
