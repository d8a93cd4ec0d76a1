//! Timestamp value object for immutable points in time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }

    /// Returns the timestamp as Unix milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Creates a new timestamp offset forward by `duration`.
    ///
    /// Saturates at the latest representable instant.
    pub fn plus(&self, duration: Duration) -> Self {
        Self(
            to_delta(duration)
                .and_then(|delta| self.0.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Creates a new timestamp offset backward by `duration`.
    ///
    /// Saturates at the earliest representable instant.
    pub fn minus(&self, duration: Duration) -> Self {
        Self(
            to_delta(duration)
                .and_then(|delta| self.0.checked_sub_signed(delta))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Milliseconds from this timestamp until `later`.
    ///
    /// Negative if `later` is actually in the past.
    pub fn millis_until(&self, later: &Timestamp) -> i64 {
        later.as_unix_millis().saturating_sub(self.as_unix_millis())
    }
}

fn to_delta(duration: Duration) -> Option<TimeDelta> {
    i64::try_from(duration.as_millis())
        .ok()
        .and_then(TimeDelta::try_milliseconds)
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn unix_millis_round_trip_is_exact() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_123);
        assert_eq!(ts.as_unix_millis(), 1_700_000_000_123);
        assert_eq!(ts.as_unix_secs(), 1_700_000_000);
    }

    #[test]
    fn plus_and_minus_shift_by_duration() {
        let ts = Timestamp::from_unix_millis(10_000);
        assert_eq!(ts.plus(Duration::from_millis(2_500)).as_unix_millis(), 12_500);
        assert_eq!(ts.minus(Duration::from_secs(4)).as_unix_millis(), 6_000);
    }

    #[test]
    fn plus_saturates_instead_of_wrapping() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_000);
        let far = ts.plus(Duration::from_millis(10_000_000_000_000_000));
        assert!(far.is_after(&ts));
        assert_eq!(ts.plus(Duration::MAX), Timestamp::from_datetime(DateTime::<Utc>::MAX_UTC));
        assert_eq!(ts.minus(Duration::MAX), Timestamp::from_datetime(DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn millis_until_is_signed() {
        let earlier = Timestamp::from_unix_millis(1_000);
        let later = Timestamp::from_unix_millis(3_500);
        assert_eq!(earlier.millis_until(&later), 2_500);
        assert_eq!(later.millis_until(&earlier), -2_500);
    }

    #[test]
    fn ordering_helpers_agree() {
        let earlier = Timestamp::from_unix_millis(1_000);
        let later = Timestamp::from_unix_millis(2_000);
        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert!(!earlier.is_after(&earlier));
    }

    #[test]
    fn timestamp_serializes_to_rfc3339() {
        let ts = Timestamp::from_unix_millis(1_705_314_600_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
    }
}
