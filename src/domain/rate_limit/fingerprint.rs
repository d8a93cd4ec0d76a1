//! Privacy-preserving client keys.
//!
//! Raw client identifiers (IP addresses) never reach logs or limiter state;
//! only their SHA-256 digest does.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Key shared by every client that cannot be identified.
pub const ANONYMOUS: &str = "anonymous";

/// Opaque, deterministic key derived from a client identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a client identifier.
    ///
    /// Absent, blank, and literal `"anonymous"` identifiers all collapse to
    /// [`Fingerprint::anonymous`], which is limited like any other key.
    pub fn of(client_id: Option<&str>) -> Self {
        match client_id {
            Some(id) if !id.trim().is_empty() && id != ANONYMOUS => {
                Self(format!("{:x}", Sha256::digest(id.as_bytes())))
            }
            _ => Self::anonymous(),
        }
    }

    /// The shared key for unidentifiable clients.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, enough to correlate log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a raw client identifier; empty strings count as absent.
pub fn fingerprint(client_id: &str) -> Fingerprint {
    Fingerprint::of(Some(client_id))
}
