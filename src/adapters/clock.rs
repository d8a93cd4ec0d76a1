//! Clock adapters.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Start at an arbitrary fixed instant.
    pub fn starting_at_epoch_millis(millis: i64) -> Self {
        Self::new(Timestamp::from_unix_millis(millis))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now = now.plus(by);
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::starting_at_epoch_millis(5_000);
        assert_eq!(clock.now().as_unix_millis(), 5_000);
        assert_eq!(clock.now().as_unix_millis(), 5_000);

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now().as_unix_millis(), 6_500);

        clock.set(Timestamp::from_unix_millis(100));
        assert_eq!(clock.now().as_unix_millis(), 100);
    }

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        assert!(!now.is_before(&before));
    }
}
