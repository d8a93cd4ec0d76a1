//! Named rate limit partitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named partition with its own thresholds and key space.
///
/// Exhausting one bucket never affects another.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// General traffic.
    Default,
    /// JSON API endpoints.
    Api,
    /// Chat message submission (AI-backed, most expensive).
    Chat,
}

impl Bucket {
    /// Every bucket, in a stable order.
    pub const ALL: [Bucket; 3] = [Bucket::Default, Bucket::Api, Bucket::Chat];

    /// Returns the string representation of the bucket.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Default => "default",
            Bucket::Api => "api",
            Bucket::Chat => "chat",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bucket name that is not one of the configured buckets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rate limit bucket: {0}")]
pub struct UnknownBucket(pub String);

impl FromStr for Bucket {
    type Err = UnknownBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Bucket::Default),
            "api" => Ok(Bucket::Api),
            "chat" => Ok(Bucket::Chat),
            other => Err(UnknownBucket(other.to_string())),
        }
    }
}
