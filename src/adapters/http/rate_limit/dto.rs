//! HTTP DTOs for rate limit endpoints.

use serde::Serialize;

use crate::domain::rate_limit::{Bucket, RateLimitStatus, SuspiciousActivity};

/// Caller's standing in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketStatusResponse {
    pub bucket: Bucket,
    pub count: u32,
    pub remaining: u32,
    pub limit: u32,
    /// Unix timestamp (seconds) when the window resets.
    pub reset_at: i64,
}

impl BucketStatusResponse {
    pub fn new(bucket: Bucket, status: &RateLimitStatus) -> Self {
        Self {
            bucket,
            count: status.count,
            remaining: status.remaining,
            limit: status.limit,
            reset_at: status.reset_at.as_unix_secs(),
        }
    }
}

/// Clients currently over their limit.
#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousActivityResponse {
    pub backend: &'static str,
    pub entries: Vec<SuspiciousActivity>,
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
