//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `rate_limit` - Per-bucket request throttling and rate limit headers
//! - `admin_access` - Socket peer allow-list for operator routes

pub mod admin_access;
pub mod rate_limit;

pub use admin_access::{admin_access_middleware, AdminAccess};
pub use rate_limit::{
    rate_limit_middleware, RateLimitCheck, RateLimitLayerState, RateLimitRejection,
    TrustedProxies, UNKNOWN_CLIENT,
};
