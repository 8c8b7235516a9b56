//! Timestamped, prioritized events and the per-family event-kind contract.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::{InvariantViolation, SimError};

use super::time::SimTime;
use super::transition::{DeviceFamily, Transition};

/// A closed set of event kinds belonging to one device family.
///
/// The priority relation decides which of two co-timed events is applied
/// first. It must be a strict total order over [`EventKind::ALL`]; see
/// [`check_priority_order`].
pub trait EventKind: Copy + Eq + Debug + Send + 'static {
    /// Every kind in the family.
    const ALL: &'static [Self];

    /// Snake-case name used in scripts, traces, and config files.
    fn name(&self) -> &'static str;

    /// Priority rank. Higher ranks are applied first at equal timestamps.
    fn priority(&self) -> u8;

    /// Returns `true` when `self` must be applied before a co-timed `other`.
    fn has_priority_over(&self, other: &Self) -> bool {
        self.priority() > other.priority()
    }

    /// Looks a kind up by its [`EventKind::name`].
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// Optional structured data carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// Requested electrical power.
    Power { watts: f64 },
}

/// An immutable occurrence at a simulated instant.
///
/// Events are created by an upstream actor, passed by value into a model's
/// intake, and discarded once applied.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use appliance_sim::devices::heater::HeaterEvent;
/// use appliance_sim::sim::event::Event;
/// use appliance_sim::sim::time::SimTime;
///
/// let heat = Event::new(SimTime::from_secs(5), HeaterEvent::BeginHeat);
/// let off = Event::new(SimTime::from_secs(5), HeaterEvent::SwitchOff);
/// assert_eq!(heat.compare(&off), Ordering::Less);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event<K: EventKind> {
    timestamp: SimTime,
    kind: K,
    payload: Payload,
}

impl<K: EventKind> Event<K> {
    /// Creates an event without payload.
    pub fn new(timestamp: SimTime, kind: K) -> Self {
        Self {
            timestamp,
            kind,
            payload: Payload::Empty,
        }
    }

    /// Creates an event carrying `payload`.
    pub fn with_payload(timestamp: SimTime, kind: K, payload: Payload) -> Self {
        Self {
            timestamp,
            kind,
            payload,
        }
    }

    pub fn timestamp(&self) -> SimTime {
        self.timestamp
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn payload(&self) -> Payload {
        self.payload
    }

    /// Returns `true` when this event must be applied before `other`
    /// if both occur at the same instant.
    pub fn has_priority_over(&self, other: &Self) -> bool {
        self.kind.has_priority_over(&other.kind)
    }

    /// Total application order: timestamp ascending, then priority.
    ///
    /// Two co-timed events of the same kind compare `Equal`; a stable sort
    /// keeps them in arrival order.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp).then_with(|| {
            if self.has_priority_over(other) {
                Ordering::Less
            } else if other.has_priority_over(self) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    /// Looks up the effect of this event on a model of family `F` sitting in
    /// `state`. Returns the next state and whether the continuous side must
    /// recompute.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation::InapplicableEvent` when the family's table
    /// marks the pair invalid.
    pub fn apply_to<F>(&self, state: F::State) -> Result<(F::State, bool), InvariantViolation>
    where
        F: DeviceFamily<Kind = K>,
    {
        match F::transition(state, self.kind) {
            Transition::To { next, recompute } => Ok((next, recompute)),
            Transition::Invalid => Err(InvariantViolation::InapplicableEvent {
                state: F::state_label(state),
                kind: self.kind.name(),
            }),
        }
    }
}

/// Verifies that `K::has_priority_over` is a strict total order.
///
/// Checks irreflexivity, that exactly one direction holds for every pair of
/// distinct kinds, and transitivity over every triple. A relation that fails
/// any of these cannot order co-timed events deterministically, so it is
/// rejected as a configuration error.
///
/// # Errors
///
/// Returns `SimError::Configuration` naming the first offending kinds.
pub fn check_priority_order<K: EventKind>() -> Result<(), SimError> {
    let kinds = K::ALL;

    for a in kinds {
        if a.has_priority_over(a) {
            return Err(SimError::Configuration(format!(
                "event kind `{}` claims priority over itself",
                a.name()
            )));
        }
    }

    for (i, a) in kinds.iter().enumerate() {
        for b in &kinds[i + 1..] {
            let ab = a.has_priority_over(b);
            let ba = b.has_priority_over(a);
            if ab == ba {
                let detail = if ab { "both claim" } else { "neither claims" };
                return Err(SimError::Configuration(format!(
                    "event kinds `{}` and `{}`: {detail} priority",
                    a.name(),
                    b.name()
                )));
            }
        }
    }

    for a in kinds {
        for b in kinds {
            for c in kinds {
                if a.has_priority_over(b) && b.has_priority_over(c) && !a.has_priority_over(c) {
                    return Err(SimError::Configuration(format!(
                        "event kinds `{}` > `{}` > `{}` but not `{}` > `{}`",
                        a.name(),
                        b.name(),
                        c.name(),
                        a.name(),
                        c.name()
                    )));
                }
            }
        }
    }

    Ok(())
}
