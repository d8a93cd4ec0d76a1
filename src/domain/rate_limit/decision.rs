use serde::Serialize;

use super::{Bucket, Fingerprint};
use crate::domain::foundation::Timestamp;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request may proceed.
    Allowed,
    /// The request must be rejected.
    Denied {
        /// Seconds until the client should retry; always at least 1.
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    /// Deny with a retry hint, never shorter than one second.
    pub fn denied(retry_after_secs: u64) -> Self {
        RateLimitDecision::Denied {
            retry_after_secs: retry_after_secs.max(1),
        }
    }

    /// Returns true if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }

    /// Returns true if the request was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitDecision::Denied { .. })
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitDecision::Allowed => None,
            RateLimitDecision::Denied { retry_after_secs } => Some(*retry_after_secs),
        }
    }
}

/// Non-mutating snapshot of a client's standing in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Attempts counted in the current window.
    pub count: u32,
    /// Attempts left before denial.
    pub remaining: u32,
    /// Attempts allowed per window.
    pub limit: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
}

impl RateLimitStatus {
    pub fn new(count: u32, limit: u32, reset_at: Timestamp) -> Self {
        Self {
            count,
            remaining: limit.saturating_sub(count),
            limit,
            reset_at,
        }
    }
}

/// A client that has exhausted a bucket, for operator review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspiciousActivity {
    pub bucket: Bucket,
    pub fingerprint: Fingerprint,
    pub attempts: u32,
    pub last_attempt: Timestamp,
}
