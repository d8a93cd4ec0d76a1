//! Rate limiting domain: buckets, client fingerprints, exemptions, and the
//! per-client entry used by the in-process backend.

mod bucket;
mod decision;
mod entry;
mod exemption;
mod fingerprint;
mod limits;

pub use bucket::{Bucket, UnknownBucket};
pub use decision::{RateLimitDecision, RateLimitStatus, SuspiciousActivity};
pub use entry::RateLimitEntry;
pub use exemption::ExemptionPolicy;
pub use fingerprint::{fingerprint, Fingerprint, ANONYMOUS};
pub use limits::RateLimitConfig;

pub(crate) use limits::ceil_secs;
