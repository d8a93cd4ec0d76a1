//! HTTP adapter for rate limit endpoints.
//!
//! - `GET /health` - Liveness probe
//! - `GET /api/rate-limit/:bucket` - Caller's standing in a bucket
//! - `GET /api/admin/rate-limit/suspicious` - Clients currently over a limit
//!   (mounted only when admin routes are enabled)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::RateLimitAppState;
pub use routes::{admin_routes, api_routes, rate_limit_router, RouterOptions};
