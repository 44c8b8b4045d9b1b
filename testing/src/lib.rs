//! # Tierhold Testing
//!
//! Testing utilities and helpers for the Tierhold reservation engine.
//!
//! This crate provides:
//! - [`ManualClock`]: a [`Clock`] that only moves when the test moves it
//! - [`ReducerTest`]: Given-When-Then harness for pure reducer tests
//! - [`assertions`]: helpers for inspecting returned effects
//!
//! ## Example
//!
//! ```ignore
//! use tierhold_testing::test_clock;
//!
//! let clock = test_clock();
//! let service = BookingService::new(config, Arc::new(clock.clone()))?;
//!
//! service.reserve("alice", "VIP", 2).await?;
//! clock.advance(chrono::Duration::minutes(11));
//! service.sweep_now().await?;
//! ```

use chrono::{DateTime, Utc};
use tierhold_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, PoisonError, RwLock};

    /// Seconds from the Unix epoch to 2025-01-01T00:00:00Z
    const TEST_EPOCH_SECS: i64 = 1_735_689_600;

    /// Manually driven clock for deterministic tests
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the code under test.
    ///
    /// # Example
    ///
    /// ```
    /// use tierhold_testing::mocks::ManualClock;
    /// use tierhold_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::new(Utc::now());
    /// let handle = clock.clone();
    /// let before = clock.now();
    ///
    /// handle.advance(Duration::seconds(30));
    /// assert_eq!(clock.now() - before, Duration::seconds(30));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, for a negative duration)
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump the clock to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a manual clock for tests, starting at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> ManualClock {
        ManualClock::new(DateTime::UNIX_EPOCH + chrono::Duration::seconds(TEST_EPOCH_SECS))
    }
}

// Re-export commonly used items
pub use mocks::{ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clock_is_frozen_until_moved() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_clones_share_time() {
        let clock = test_clock();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::minutes(10));
        assert_eq!(clock.now(), start + Duration::minutes(10));

        clock.set(start);
        assert_eq!(other.now(), start);
    }
}
