//! # Offline Desk Testing
//!
//! Testing utilities for Offline Desk workflows.
//!
//! This crate provides:
//! - A fluent Given-When-Then harness for reducers ([`ReducerTest`])
//! - Effect assertions and a helper that runs effects to completion
//! - A deterministic clock
//! - Test-friendly tracing setup
//!
//! ## Example
//!
//! ```ignore
//! use offline_desk_testing::{ReducerTest, test_clock};
//!
//! #[test]
//! fn search_enters_searching() {
//!     ReducerTest::new(RiderDeskReducer::new())
//!         .with_env(test_environment())
//!         .given_state(ResolutionState::default())
//!         .when_action(RiderAction::SearchRider { mobile })
//!         .then_state(|s| assert_eq!(s.phase(), Phase::Searching))
//!         .run();
//! }
//! ```

use chrono::{DateTime, Utc};
use offline_desk_core::environment::Clock;

/// Reducer test harness
pub mod reducer_test;

/// Mock implementations of core environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use offline_desk_testing::mocks::FixedClock;
    /// use offline_desk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Install a `tracing` subscriber that writes through the test harness
///
/// Honors `RUST_LOG`; defaults to `debug`. Safe to call from every test,
/// only the first call installs a subscriber.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions, run_effects};
