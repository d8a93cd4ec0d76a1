//! Chat Throttle - request rate limiting for the therapy chat API
//!
//! Per-client, per-bucket throttling with two interchangeable backends: an
//! in-process fixed window with a block period, and an atomic counter shared
//! through Redis.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
