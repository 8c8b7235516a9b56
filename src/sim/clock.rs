use std::time::Duration;

use crate::error::SimError;

use super::time::SimTime;

/// The global simulated-time cursor owned by the scheduler.
///
/// Time only moves forward and never on its own: models report how long they
/// can wait, and the scheduler advances the clock to the next instant at which
/// something happens.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use appliance_sim::sim::clock::SimClock;
/// use appliance_sim::sim::time::SimTime;
///
/// let mut clock = SimClock::new(SimTime::from_secs(10));
/// clock.advance_to(SimTime::from_secs(25)).unwrap();
/// assert_eq!(clock.elapsed(), Duration::from_secs(15));
/// assert!(clock.advance_to(SimTime::from_secs(20)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Current simulated instant
    current: SimTime,
    /// Instant the run started at
    start: SimTime,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(SimTime::ZERO)
    }
}

impl SimClock {
    /// Creates a clock positioned at `start`.
    pub fn new(start: SimTime) -> Self {
        Self {
            current: start,
            start,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.current
    }

    /// Instant the clock was started or last reset at.
    pub fn start(&self) -> SimTime {
        self.start
    }

    /// Simulated time elapsed since the start.
    pub fn elapsed(&self) -> Duration {
        self.current.saturating_since(self.start)
    }

    /// Moves the clock forward to `target` and returns the distance travelled.
    ///
    /// Advancing to the current instant is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Clock` if `target` is in the past.
    pub fn advance_to(&mut self, target: SimTime) -> Result<Duration, SimError> {
        if target < self.current {
            return Err(SimError::Clock {
                now: self.current,
                target,
            });
        }
        let jump = target.saturating_since(self.current);
        self.current = target;
        Ok(jump)
    }

    /// Moves the clock back to a new start for another run.
    pub fn reset(&mut self, start: SimTime) {
        self.start = start;
        self.current = start;
    }
}
