//! Atomic discrete-event models and the four-phase stepping protocol.

use std::fmt;
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use crate::error::{InvariantViolation, SimError};

use super::event::{Event, EventKind, Payload, check_priority_order};
use super::time::{SimTime, TimeAdvance};
use super::transition::DeviceFamily;

/// Lifecycle phase of a model, as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, no time defined yet.
    Initial,
    /// Waiting for an external event (time advance is infinite).
    Idle,
    /// Events pending (time advance is zero).
    Ready,
    /// Finalized or stopped by a fatal error. No further calls accepted.
    Terminal,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Idle => "idle",
            Phase::Ready => "ready",
            Phase::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a model does in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Owns a discrete state and applies events to it.
    Device,
    /// Relays events across a hierarchy boundary.
    Bridge,
}

/// What to do when more than one event is buffered before a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakePolicy {
    /// Exactly one event per step; a second one is an invariant violation.
    Strict,
    /// Keep the intake sorted by [`Event::compare`] and apply one per step.
    #[default]
    PriorityOrdered,
}

/// Owning context handed to a model at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContext {
    /// Name of the hierarchy (owning component) the model lives in.
    pub owner: String,
    /// Multi-event intake handling.
    pub intake_policy: IntakePolicy,
}

impl ModelContext {
    /// Context for a model owned by `owner` with the default intake policy.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            intake_policy: IntakePolicy::default(),
        }
    }

    /// Replaces the intake policy.
    pub fn with_policy(mut self, intake_policy: IntakePolicy) -> Self {
        self.intake_policy = intake_policy;
        self
    }

    pub(crate) fn validate(&self, id: &str) -> Result<(), SimError> {
        if id.trim().is_empty() {
            return Err(SimError::Configuration(
                "model identity must not be empty".to_string(),
            ));
        }
        if self.owner.trim().is_empty() {
            return Err(SimError::Configuration(format!(
                "model `{id}` has no owning context"
            )));
        }
        Ok(())
    }
}

/// Notification that a transition changed what the continuous side derives
/// from the discrete state.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeNotice<S> {
    /// Identity of the model that transitioned.
    pub model: String,
    /// Simulated time of the transition.
    pub at: SimTime,
    /// State after the transition.
    pub state: S,
    /// Payload of the event that caused it.
    pub payload: Payload,
}

/// The scheduler-facing protocol shared by atomic models and bridges.
pub trait Model<K: EventKind> {
    /// Stable identity, unique within a run.
    fn id(&self) -> &str;

    /// Hierarchy the model belongs to.
    fn hierarchy(&self) -> &str;

    fn role(&self) -> ModelRole;

    fn phase(&self) -> Phase;

    /// Simulated time of the last accepted event or initialization.
    fn current_time(&self) -> SimTime;

    /// Label of the current discrete state, for traces.
    fn state_label(&self) -> &'static str;

    /// For bridges: the downstream model relayed events are destined for.
    fn relay_target(&self) -> Option<&str> {
        None
    }

    /// Enters the idle phase at `start`. Callable once per run.
    fn initialize(&mut self, start: SimTime) -> Result<(), SimError>;

    /// Buffers an external event without touching the discrete state.
    fn receive_external(&mut self, event: Event<K>) -> Result<(), SimError>;

    /// Zero while events are buffered, infinite otherwise.
    fn time_advance(&self) -> TimeAdvance;

    /// Consumes one buffered event and prepares it as the pending output.
    fn internal_transition(&mut self) -> Result<(), SimError>;

    /// Returns and clears the pending output.
    fn output(&mut self) -> Result<Event<K>, SimError>;

    /// Moves to the terminal phase.
    fn finalize(&mut self, end: SimTime) -> Result<(), SimError>;

    /// Drops buffered events without applying them. Returns how many.
    fn discard_pending(&mut self) -> usize;
}

/// One device's discrete-event state machine.
///
/// Generic over a [`DeviceFamily`], which supplies the state set, the event
/// set, and the transition table.
///
/// # Examples
///
/// ```
/// use appliance_sim::devices::heater::{Heater, HeaterEvent, HeaterState};
/// use appliance_sim::sim::event::Event;
/// use appliance_sim::sim::model::{AtomicModel, Model, ModelContext};
/// use appliance_sim::sim::time::SimTime;
///
/// let mut heater = AtomicModel::<Heater>::new("heater", ModelContext::new("house")).unwrap();
/// heater.initialize(SimTime::ZERO).unwrap();
/// heater.receive_external(Event::new(SimTime::ZERO, HeaterEvent::SwitchOn)).unwrap();
/// assert!(heater.time_advance().is_immediate());
///
/// heater.internal_transition().unwrap();
/// let out = heater.output().unwrap();
/// assert_eq!(out.kind(), HeaterEvent::SwitchOn);
/// assert_eq!(heater.state(), HeaterState::On);
/// assert!(heater.time_advance().is_infinite());
/// ```
pub struct AtomicModel<F: DeviceFamily> {
    id: String,
    context: ModelContext,
    phase: Phase,
    state: F::State,
    current_time: SimTime,
    intake: Vec<Event<F::Kind>>,
    pending_output: Option<Event<F::Kind>>,
    recompute: Option<Sender<RecomputeNotice<F::State>>>,
    history: Vec<F::State>,
}

impl<F: DeviceFamily> AtomicModel<F> {
    /// Creates a model in the initial phase.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` if the identity or owner is empty or
    /// the family's priority relation is not a strict total order.
    pub fn new(id: impl Into<String>, context: ModelContext) -> Result<Self, SimError> {
        let id = id.into();
        context.validate(&id)?;
        check_priority_order::<F::Kind>()?;

        Ok(Self {
            id,
            context,
            phase: Phase::Initial,
            state: F::rest_state(),
            current_time: SimTime::ZERO,
            intake: Vec::new(),
            pending_output: None,
            recompute: None,
            history: Vec::new(),
        })
    }

    /// Attaches the channel recompute notices are sent on.
    pub fn with_recompute_channel(mut self, sender: Sender<RecomputeNotice<F::State>>) -> Self {
        self.recompute = Some(sender);
        self
    }

    /// Current discrete state.
    pub fn state(&self) -> F::State {
        self.state
    }

    /// Every state entered by applied events, in order.
    pub fn history(&self) -> &[F::State] {
        &self.history
    }

    /// Number of events waiting in the intake.
    pub fn intake_len(&self) -> usize {
        self.intake.len()
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    fn fail(&mut self, violation: InvariantViolation) -> SimError {
        warn!(model = %self.id, %violation, "atomic model stopped");
        self.phase = Phase::Terminal;
        SimError::invariant(self.id.clone(), violation)
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

    fn refresh_phase(&mut self) {
        self.phase = if self.intake.is_empty() {
            Phase::Idle
        } else {
            Phase::Ready
        };
    }
}

impl<F: DeviceFamily> Model<F::Kind> for AtomicModel<F> {
    fn id(&self) -> &str {
        &self.id
    }

    fn hierarchy(&self) -> &str {
        &self.context.owner
    }

    fn role(&self) -> ModelRole {
        ModelRole::Device
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn current_time(&self) -> SimTime {
        self.current_time
    }

    fn state_label(&self) -> &'static str {
        F::state_label(self.state)
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
        self.state = F::rest_state();
        self.current_time = start;
        self.intake.clear();
        self.pending_output = None;
        self.history.clear();
        self.phase = Phase::Idle;
        debug!(
            model = %self.id,
            family = F::NAME,
            state = F::state_label(self.state),
            %start,
            "initialized"
        );
        Ok(())
    }

    fn receive_external(&mut self, event: Event<F::Kind>) -> Result<(), SimError> {
        self.ensure_running("receive_external")?;

        if event.timestamp() < self.current_time {
            return Err(self.fail(InvariantViolation::EventInPast {
                event_time: event.timestamp(),
                model_time: self.current_time,
            }));
        }

        match self.context.intake_policy {
            IntakePolicy::Strict => {
                if let Some(buffered) = self.intake.first() {
                    let buffered = buffered.kind().name();
                    return Err(self.fail(InvariantViolation::SurplusEvent {
                        buffered,
                        incoming: event.kind().name(),
                    }));
                }
                self.intake.push(event);
            }
            IntakePolicy::PriorityOrdered => {
                let at = self
                    .intake
                    .partition_point(|queued| queued.compare(&event).is_le());
                self.intake.insert(at, event);
            }
        }

        self.refresh_phase();
        Ok(())
    }

    fn time_advance(&self) -> TimeAdvance {
        match self.phase {
            Phase::Idle | Phase::Ready if !self.intake.is_empty() => TimeAdvance::IMMEDIATE,
            _ => TimeAdvance::Infinite,
        }
    }

    fn internal_transition(&mut self) -> Result<(), SimError> {
        self.ensure_running("internal_transition")?;

        if let Some(stranded) = &self.pending_output {
            let kind = stranded.kind().name();
            return Err(self.fail(InvariantViolation::UncollectedOutput { kind }));
        }
        if self.intake.is_empty() {
            return Err(self.fail(InvariantViolation::EmptyIntake));
        }

        let event = self.intake.remove(0);
        let (next, recompute) = match event.apply_to::<F>(self.state) {
            Ok(effect) => effect,
            Err(violation) => return Err(self.fail(violation)),
        };

        if recompute {
            if let Some(sender) = &self.recompute {
                let notice = RecomputeNotice {
                    model: self.id.clone(),
                    at: event.timestamp(),
                    state: next,
                    payload: event.payload(),
                };
                if sender.send(notice).is_err() {
                    return Err(self.fail(InvariantViolation::RecomputeDisconnected));
                }
            }
        }

        debug!(
            model = %self.id,
            at = %event.timestamp(),
            kind = event.kind().name(),
            from = F::state_label(self.state),
            to = F::state_label(next),
            "transition applied"
        );

        self.state = next;
        self.history.push(next);
        self.current_time = event.timestamp();
        self.pending_output = Some(event);
        self.refresh_phase();
        Ok(())
    }

    fn output(&mut self) -> Result<Event<F::Kind>, SimError> {
        self.ensure_running("output")?;
        match self.pending_output.take() {
            Some(event) => Ok(event),
            None => Err(self.fail(InvariantViolation::NothingPending)),
        }
    }

    fn finalize(&mut self, end: SimTime) -> Result<(), SimError> {
        self.ensure_running("finalize")?;
        if !self.intake.is_empty() {
            debug!(
                model = %self.id,
                dropped = self.intake.len(),
                "finalized with unapplied events"
            );
        }
        self.intake.clear();
        self.pending_output = None;
        self.current_time = self.current_time.max(end);
        self.phase = Phase::Terminal;
        Ok(())
    }

    fn discard_pending(&mut self) -> usize {
        let dropped = self.intake.len() + usize::from(self.pending_output.is_some());
        self.intake.clear();
        self.pending_output = None;
        if matches!(self.phase, Phase::Ready) {
            self.phase = Phase::Idle;
        }
        dropped
    }
}
