use crate::domain::foundation::Timestamp;

/// Source of the current time.
///
/// Limiters read time through this port so window and block expiry can be
/// driven deterministically in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Timestamp;
}
