//! HTTP adapters - REST API implementations.

pub mod middleware;
pub mod rate_limit;

pub use rate_limit::{rate_limit_router, RateLimitAppState, RouterOptions};
