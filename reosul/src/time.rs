//! Timing of connector executions.
//!
//! Two durations govern a connector run:
//!
//! * the *delay*, which bounds every rendezvous attempt on a port: a write or
//!   a read that does not find its counterpart within this bound is
//!   abandoned, and a channel process never blocks an instance for longer
//!   than this bound without re-checking for a stop request,
//! * the *time unit*, which is the wall-clock duration of one
//!   [`Input::Tick`](crate::symbols::Input::Tick) step.
//!
//! Neither is a real-time guarantee: the delay is a timeout, not a deadline
//! the connector is expected to meet.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use reosul::time::Timing;
//!
//! let timing = Timing::new(Duration::from_millis(10), Duration::from_millis(50));
//! assert_eq!(timing.delay(), Duration::from_millis(10));
//! assert_eq!(Timing::default().time_unit(), Timing::DEFAULT_TIME_UNIT);
//! ```

use std::time::Duration;

/// Rendezvous delay and time unit of a connector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timing {
    delay: Duration,
    time_unit: Duration,
}

impl Timing {
    /// Default bound of a rendezvous attempt.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(20);

    /// Default duration of a time-advance step.
    pub const DEFAULT_TIME_UNIT: Duration = Duration::from_millis(100);

    /// Creates a timing with the specified rendezvous delay and time unit.
    ///
    /// # Panics
    ///
    /// This will panic if the delay is zero, since no rendezvous could ever
    /// succeed.
    pub fn new(delay: Duration, time_unit: Duration) -> Self {
        assert!(!delay.is_zero(), "the rendezvous delay must be non-zero");

        Self { delay, time_unit }
    }

    /// Returns the bound of a rendezvous attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the duration of a time-advance step.
    pub fn time_unit(&self) -> Duration {
        self.time_unit
    }

    /// Blocks the calling thread for one time unit.
    pub(crate) fn advance(&self) {
        spin_sleep::sleep(self.time_unit);
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            delay: Self::DEFAULT_DELAY,
            time_unit: Self::DEFAULT_TIME_UNIT,
        }
    }
}
