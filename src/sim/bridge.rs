//! Pass-through model relaying events across a hierarchy boundary.

use tracing::{debug, warn};

use crate::error::{InvariantViolation, SimError};

use super::event::{Event, EventKind, check_priority_order};
use super::model::{Model, ModelContext, ModelRole, Phase};
use super::time::{SimTime, TimeAdvance};

/// Relays every received event, verbatim and at the same timestamp, toward a
/// named model in another hierarchy.
///
/// The bridge holds at most one event. It never validates device-state
/// preconditions; that is the downstream model's job. Receiving a second
/// event before the first one has been relayed is an ordering violation.
pub struct BridgeModel<K: EventKind> {
    id: String,
    context: ModelContext,
    target: String,
    phase: Phase,
    current_time: SimTime,
    inbound: Option<Event<K>>,
    outbound: Option<Event<K>>,
    relayed: u64,
}

impl<K: EventKind> BridgeModel<K> {
    /// Creates a bridge owned by `context.owner` relaying to `target`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` if any name is empty or the event
    /// family's priority relation is inconsistent.
    pub fn new(
        id: impl Into<String>,
        context: ModelContext,
        target: impl Into<String>,
    ) -> Result<Self, SimError> {
        let id = id.into();
        let target = target.into();
        context.validate(&id)?;
        if target.trim().is_empty() {
            return Err(SimError::Configuration(format!(
                "bridge `{id}` has no downstream target"
            )));
        }
        if target == id {
            return Err(SimError::Configuration(format!(
                "bridge `{id}` cannot relay to itself"
            )));
        }
        check_priority_order::<K>()?;

        Ok(Self {
            id,
            context,
            target,
            phase: Phase::Initial,
            current_time: SimTime::ZERO,
            inbound: None,
            outbound: None,
            relayed: 0,
        })
    }

    /// Number of events relayed so far.
    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    fn ordering_violation(&mut self, detail: String) -> SimError {
        warn!(bridge = %self.id, %detail, "bridge stopped");
        self.phase = Phase::Terminal;
        SimError::Ordering {
            bridge: self.id.clone(),
            detail,
        }
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), SimError> {
        match self.phase {
            Phase::Idle | Phase::Ready => Ok(()),
            phase => Err(SimError::invariant(
                self.id.clone(),
                InvariantViolation::WrongPhase {
                    operation,
                    phase: phase.label(),
                },
            )),
        }
    }
}

impl<K: EventKind> Model<K> for BridgeModel<K> {
    fn id(&self) -> &str {
        &self.id
    }

    fn hierarchy(&self) -> &str {
        &self.context.owner
    }

    fn role(&self) -> ModelRole {
        ModelRole::Bridge
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn current_time(&self) -> SimTime {
        self.current_time
    }

    fn state_label(&self) -> &'static str {
        if self.inbound.is_some() || self.outbound.is_some() {
            "relaying"
        } else {
            "idle"
        }
    }

    fn relay_target(&self) -> Option<&str> {
        Some(&self.target)
    }

    fn initialize(&mut self, start: SimTime) -> Result<(), SimError> {
        if self.phase != Phase::Initial {
            return Err(SimError::invariant(
                self.id.clone(),
                InvariantViolation::WrongPhase {
                    operation: "initialize",
                    phase: self.phase.label(),
                },
            ));
        }
        self.current_time = start;
        self.inbound = None;
        self.outbound = None;
        self.relayed = 0;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn receive_external(&mut self, event: Event<K>) -> Result<(), SimError> {
        self.ensure_running("receive_external")?;

        if event.timestamp() < self.current_time {
            return Err(self.ordering_violation(format!(
                "`{}` at {} arrived after {}",
                event.kind().name(),
                event.timestamp(),
                self.current_time
            )));
        }

        if let Some(waiting) = self.inbound.as_ref().or(self.outbound.as_ref()) {
            let detail = format!(
                "`{}` at {} arrived before `{}` at {} was relayed",
                event.kind().name(),
                event.timestamp(),
                waiting.kind().name(),
                waiting.timestamp()
            );
            return Err(self.ordering_violation(detail));
        }

        self.current_time = event.timestamp();
        self.inbound = Some(event);
        self.phase = Phase::Ready;
        Ok(())
    }

    fn time_advance(&self) -> TimeAdvance {
        if self.phase == Phase::Ready && self.inbound.is_some() {
            TimeAdvance::IMMEDIATE
        } else {
            TimeAdvance::Infinite
        }
    }

    fn internal_transition(&mut self) -> Result<(), SimError> {
        self.ensure_running("internal_transition")?;
        if let Some(stranded) = &self.outbound {
            let kind = stranded.kind().name();
            return Err(self.ordering_violation(format!(
                "relay of `{kind}` was never collected"
            )));
        }
        match self.inbound.take() {
            Some(event) => {
                self.outbound = Some(event);
                Ok(())
            }
            None => {
                self.phase = Phase::Terminal;
                Err(SimError::invariant(
                    self.id.clone(),
                    InvariantViolation::EmptyIntake,
                ))
            }
        }
    }

    fn output(&mut self) -> Result<Event<K>, SimError> {
        self.ensure_running("output")?;
        match self.outbound.take() {
            Some(event) => {
                self.relayed += 1;
                self.phase = Phase::Idle;
                debug!(
                    bridge = %self.id,
                    target = %self.target,
                    at = %event.timestamp(),
                    kind = event.kind().name(),
                    "relayed"
                );
                Ok(event)
            }
            None => {
                self.phase = Phase::Terminal;
                Err(SimError::invariant(
                    self.id.clone(),
                    InvariantViolation::NothingPending,
                ))
            }
        }
    }

    fn finalize(&mut self, end: SimTime) -> Result<(), SimError> {
        self.ensure_running("finalize")?;
        self.inbound = None;
        self.outbound = None;
        self.current_time = self.current_time.max(end);
        self.phase = Phase::Terminal;
        Ok(())
    }

    fn discard_pending(&mut self) -> usize {
        let dropped = usize::from(self.inbound.is_some()) + usize::from(self.outbound.is_some());
        self.inbound = None;
        self.outbound = None;
        if self.phase == Phase::Ready {
            self.phase = Phase::Idle;
        }
        dropped
    }
}
