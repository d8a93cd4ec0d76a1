//! Domain layer - rate limiting rules free of I/O.

pub mod foundation;
pub mod rate_limit;
