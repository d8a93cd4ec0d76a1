//! Foundation value objects shared across the domain.

mod timestamp;

pub use timestamp::Timestamp;
