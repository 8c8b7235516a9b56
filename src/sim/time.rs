//! Simulated time values shared by events, models, and the scheduler.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A point on the simulated timeline, measured from the start of the run.
///
/// Independent of wall-clock time. Totally ordered, so it can serve as the
/// primary key of the event order.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use appliance_sim::sim::time::SimTime;
///
/// let t = SimTime::from_secs(5) + Duration::from_millis(500);
/// assert_eq!(t.as_secs_f64(), 5.5);
/// assert!(SimTime::ZERO < t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of every simulation run.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Creates a time `secs` whole seconds after the run start.
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Creates a time `millis` milliseconds after the run start.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Creates a time from fractional seconds.
    ///
    /// Returns `None` for negative, NaN, or overflowing input.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        Duration::try_from_secs_f64(secs).ok().map(Self)
    }

    /// Offset from the run start.
    pub fn since_start(&self) -> Duration {
        self.0
    }

    /// Offset from the run start in fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Duration elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 + rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// How long a model can wait before its next internal step.
///
/// Atomic models and bridges only ever report `After(Duration::ZERO)`
/// (events pending) or `Infinite` (passive until woken).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAdvance {
    /// Step after the given simulated delay.
    After(Duration),
    /// Nothing to do until an external event arrives.
    Infinite,
}

impl TimeAdvance {
    /// Zero delay: the model must be stepped at the current instant.
    pub const IMMEDIATE: TimeAdvance = TimeAdvance::After(Duration::ZERO);

    /// Returns `true` when the model is ready to fire now.
    pub fn is_immediate(&self) -> bool {
        matches!(self, TimeAdvance::After(d) if d.is_zero())
    }

    /// Returns `true` when the model waits for an external event.
    pub fn is_infinite(&self) -> bool {
        matches!(self, TimeAdvance::Infinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_offset() {
        assert!(SimTime::from_secs(1) < SimTime::from_secs(2));
        assert_eq!(SimTime::from_millis(5000), SimTime::from_secs(5));
    }

    #[test]
    fn from_secs_f64_rejects_bad_input() {
        assert!(SimTime::from_secs_f64(-1.0).is_none());
        assert!(SimTime::from_secs_f64(f64::NAN).is_none());
        assert_eq!(SimTime::from_secs_f64(2.5), Some(SimTime::from_millis(2500)));
    }

    #[test]
    fn saturating_since_never_underflows() {
        let early = SimTime::from_secs(3);
        let late = SimTime::from_secs(10);
        assert_eq!(late.saturating_since(early), Duration::from_secs(7));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn time_advance_classification() {
        assert!(TimeAdvance::IMMEDIATE.is_immediate());
        assert!(!TimeAdvance::After(Duration::from_secs(1)).is_immediate());
        assert!(TimeAdvance::Infinite.is_infinite());
        assert!(!TimeAdvance::Infinite.is_immediate());
    }
}
