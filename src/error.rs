//! Error types for the simulation core.
//!
//! Every failure here reflects a logical inconsistency in the model network,
//! never an environmental fault, so nothing is retried: the scheduler surfaces
//! the error and the run stops.

use thiserror::Error;

use crate::sim::time::SimTime;

/// Broken protocol or state-machine invariant inside one model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The event kind has no transition from the model's current state.
    #[error("event `{kind}` is inapplicable in state `{state}`")]
    InapplicableEvent {
        /// Discrete state the model was in.
        state: &'static str,
        /// Rejected event kind.
        kind: &'static str,
    },

    /// `output()` was called with nothing pending.
    #[error("output requested with no pending event")]
    NothingPending,

    /// `internal_transition()` was called with an empty intake.
    #[error("internal transition requested with an empty intake")]
    EmptyIntake,

    /// A previous output was never collected before the next transition.
    #[error("pending output `{kind}` was never collected")]
    UncollectedOutput {
        /// Kind of the stranded output event.
        kind: &'static str,
    },

    /// A strict-intake model received more than one event per step.
    #[error("received `{incoming}` while `{buffered}` is still buffered")]
    SurplusEvent {
        /// Kind already waiting in the intake.
        buffered: &'static str,
        /// Kind that arrived on top of it.
        incoming: &'static str,
    },

    /// An event older than the model's current time was delivered.
    #[error("event at {event_time} precedes model time {model_time}")]
    EventInPast {
        /// Timestamp carried by the event.
        event_time: SimTime,
        /// The model's current simulated time.
        model_time: SimTime,
    },

    /// A protocol operation was invoked in the wrong lifecycle phase.
    #[error("`{operation}` is not allowed in phase {phase}")]
    WrongPhase {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Phase label at the time of the call.
        phase: &'static str,
    },

    /// The recompute channel's receiving side has gone away.
    #[error("recompute channel disconnected")]
    RecomputeDisconnected,
}

/// Errors surfaced by models, bridges, and the scheduler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A model broke one of its invariants; fatal for the run.
    #[error("invariant violation in model `{model}`: {violation}")]
    Invariant {
        /// Identity of the offending model.
        model: String,
        /// What went wrong.
        violation: InvariantViolation,
    },

    /// A bridge received a new event before relaying the previous one.
    #[error("ordering violation in bridge `{bridge}`: {detail}")]
    Ordering {
        /// Identity of the bridge.
        bridge: String,
        /// Description of the conflicting events.
        detail: String,
    },

    /// The model network was wired or constructed incorrectly.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation named a model the scheduler does not know.
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// The simulated clock was asked to move backwards.
    #[error("clock error: cannot move from {now} back to {target}")]
    Clock {
        /// Current clock reading.
        now: SimTime,
        /// Requested earlier time.
        target: SimTime,
    },

    /// A run-level limit stopped the scheduler loop.
    #[error("run aborted at {at}: {reason} ({discarded} in-flight events discarded)")]
    Aborted {
        /// Simulated time at which the run stopped.
        at: SimTime,
        /// Which limit was hit.
        reason: String,
        /// Buffered events dropped without being applied.
        discarded: usize,
    },
}

impl SimError {
    /// Wraps an invariant violation with the offending model's identity.
    pub fn invariant(model: impl Into<String>, violation: InvariantViolation) -> Self {
        SimError::Invariant {
            model: model.into(),
            violation,
        }
    }

    /// Returns `true` for errors that indicate a defect in event generation
    /// or wiring rather than a run-level limit.
    pub fn is_logic_defect(&self) -> bool {
        !matches!(self, SimError::Aborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_display_names_model_and_cause() {
        let err = SimError::invariant(
            "heater",
            InvariantViolation::InapplicableEvent {
                state: "off",
                kind: "switch_off",
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("heater"));
        assert!(msg.contains("switch_off"));
        assert!(msg.contains("off"));
    }

    #[test]
    fn aborted_is_not_a_logic_defect() {
        let aborted = SimError::Aborted {
            at: SimTime::ZERO,
            reason: "step budget".into(),
            discarded: 2,
        };
        assert!(!aborted.is_logic_defect());
        assert!(SimError::UnknownModel("x".into()).is_logic_defect());
    }
}
