//! Reference scheduler: owns the simulated clock, delivers events, steps
//! imminent models, and fans produced events out to subscribers.

use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::SimError;

use super::clock::SimClock;
use super::event::{Event, EventKind, Payload};
use super::model::{Model, ModelRole, Phase};
use super::time::{SimTime, TimeAdvance};

/// Run-level limits. Hitting either bound aborts the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLimits {
    /// Maximum number of model steps across the whole run.
    pub max_steps: Option<u64>,
    /// Wall-clock budget for the run.
    pub wall_deadline: Option<Duration>,
    /// Best-effort pacing: simulated seconds per wall-clock second.
    /// `None` runs as fast as possible.
    pub acceleration: Option<f64>,
}

/// One produced event, as observed by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Timestamp carried by the event.
    pub at: SimTime,
    /// Model that produced it.
    pub model: String,
    /// Hierarchy the producer lives in.
    pub hierarchy: String,
    /// Producer role.
    pub role: ModelRole,
    /// Event kind name.
    pub kind: &'static str,
    /// Producer's discrete state after the step.
    pub state: &'static str,
    /// Event payload.
    pub payload: Payload,
}

/// Totals reported by [`Scheduler::run_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Simulated time the run stopped at.
    pub ended_at: SimTime,
    /// Model steps taken so far.
    pub steps: u64,
}

struct Subscription<K> {
    source: usize,
    kind: K,
    target: usize,
}

struct Injection<K: EventKind> {
    target: usize,
    event: Event<K>,
}

/// Drives a network of models sharing event family `K`.
///
/// Models are stepped in waves: at a fixed simulated instant every model whose
/// time advance is zero fires once, in registration order, and only then are
/// the produced events fanned out. A bridge therefore relays the event it
/// holds before its producer's next co-timed event reaches it.
///
/// # Examples
///
/// ```
/// use appliance_sim::devices::heater::{Heater, HeaterEvent};
/// use appliance_sim::sim::bridge::BridgeModel;
/// use appliance_sim::sim::event::Event;
/// use appliance_sim::sim::model::{AtomicModel, ModelContext};
/// use appliance_sim::sim::scheduler::Scheduler;
/// use appliance_sim::sim::time::SimTime;
///
/// # fn main() -> Result<(), appliance_sim::error::SimError> {
/// let mut scheduler = Scheduler::new();
/// scheduler.register(AtomicModel::<Heater>::new("heater", ModelContext::new("house"))?)?;
/// scheduler.register(BridgeModel::<HeaterEvent>::new(
///     "bridge",
///     ModelContext::new("house"),
///     "heater@meter",
/// )?)?;
/// scheduler.register(AtomicModel::<Heater>::new("heater@meter", ModelContext::new("meter"))?)?;
/// scheduler.subscribe_all("heater", "bridge")?;
/// scheduler.subscribe_all("bridge", "heater@meter")?;
///
/// scheduler.initialize(SimTime::ZERO)?;
/// scheduler.schedule("heater", Event::new(SimTime::from_secs(1), HeaterEvent::SwitchOn))?;
/// scheduler.run_until(SimTime::from_secs(10))?;
///
/// assert_eq!(scheduler.state_of("heater@meter"), Some("on"));
/// # Ok(())
/// # }
/// ```
pub struct Scheduler<K: EventKind> {
    clock: SimClock,
    models: Vec<Box<dyn Model<K>>>,
    index: HashMap<String, usize>,
    subscriptions: Vec<Subscription<K>>,
    injections: BTreeMap<(SimTime, u64), Injection<K>>,
    next_seq: u64,
    limits: RunLimits,
    trace: Vec<TraceEntry>,
    steps: u64,
    wall_start: Option<Instant>,
    initialized: bool,
}

impl<K: EventKind> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EventKind> Scheduler<K> {
    /// Creates a scheduler without run limits.
    pub fn new() -> Self {
        Self::with_limits(RunLimits::default())
    }

    /// Creates a scheduler enforcing `limits`.
    pub fn with_limits(limits: RunLimits) -> Self {
        Self {
            clock: SimClock::default(),
            models: Vec::new(),
            index: HashMap::new(),
            subscriptions: Vec::new(),
            injections: BTreeMap::new(),
            next_seq: 0,
            limits,
            trace: Vec::new(),
            steps: 0,
            wall_start: None,
            initialized: false,
        }
    }

    /// Adds a model to the network.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Configuration` for a duplicate identity or when
    /// called after [`Scheduler::initialize`].
    pub fn register(&mut self, model: impl Model<K> + 'static) -> Result<(), SimError> {
        if self.initialized {
            return Err(SimError::Configuration(format!(
                "model `{}` registered after initialization",
                model.id()
            )));
        }
        let id = model.id().to_string();
        if self.index.contains_key(&id) {
            return Err(SimError::Configuration(format!(
                "duplicate model identity `{id}`"
            )));
        }
        self.index.insert(id, self.models.len());
        self.models.push(Box::new(model));
        Ok(())
    }

    /// Routes every event of `kind` produced by `source` to `downstream`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownModel` for unknown names, and
    /// `SimError::Configuration` for self-subscriptions, for a bridge
    /// subscribing anything but its relay target, or for a non-bridge
    /// subscribing across a hierarchy boundary.
    pub fn subscribe(&mut self, source: &str, kind: K, downstream: &str) -> Result<(), SimError> {
        let src = self.lookup(source)?;
        let dst = self.lookup(downstream)?;
        if src == dst {
            return Err(SimError::Configuration(format!(
                "model `{source}` cannot subscribe to itself"
            )));
        }

        let producer = &self.models[src];
        let consumer = &self.models[dst];
        match producer.role() {
            ModelRole::Bridge => {
                if producer.relay_target() != Some(consumer.id()) {
                    return Err(SimError::Configuration(format!(
                        "bridge `{source}` may only feed its relay target, not `{downstream}`"
                    )));
                }
            }
            ModelRole::Device => {
                if producer.hierarchy() != consumer.hierarchy() {
                    return Err(SimError::Configuration(format!(
                        "`{source}` ({}) and `{downstream}` ({}) live in different hierarchies; \
                         connect them through a bridge",
                        producer.hierarchy(),
                        consumer.hierarchy()
                    )));
                }
            }
        }

        let exists = self
            .subscriptions
            .iter()
            .any(|s| s.source == src && s.kind == kind && s.target == dst);
        if !exists {
            self.subscriptions.push(Subscription {
                source: src,
                kind,
                target: dst,
            });
        }
        Ok(())
    }

    /// Subscribes `downstream` to every kind `source` can produce.
    ///
    /// # Errors
    ///
    /// Same as [`Scheduler::subscribe`].
    pub fn subscribe_all(&mut self, source: &str, downstream: &str) -> Result<(), SimError> {
        for kind in K::ALL {
            self.subscribe(source, *kind, downstream)?;
        }
        Ok(())
    }

    /// Initializes every registered model at `start`.
    ///
    /// # Errors
    ///
    /// Propagates the first model initialization error.
    pub fn initialize(&mut self, start: SimTime) -> Result<(), SimError> {
        if self.initialized {
            return Err(SimError::Configuration(
                "scheduler initialized twice".to_string(),
            ));
        }
        self.clock.reset(start);
        for model in &mut self.models {
            model.initialize(start)?;
        }
        self.initialized = true;
        info!(models = self.models.len(), %start, "simulation initialized");
        Ok(())
    }

    /// Pushes `event` into a model's intake right away, advancing the clock to
    /// the event's timestamp first.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Clock` if the event lies in the simulated past, or
    /// the model's own error if it rejects the event.
    pub fn deliver(&mut self, model_id: &str, event: Event<K>) -> Result<(), SimError> {
        let idx = self.lookup(model_id)?;
        self.clock.advance_to(event.timestamp())?;
        self.models[idx].receive_external(event)
    }

    /// Queues `event` for delivery to `model_id` when the clock reaches its
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Clock` if the event lies in the simulated past.
    pub fn schedule(&mut self, model_id: &str, event: Event<K>) -> Result<(), SimError> {
        let target = self.lookup(model_id)?;
        if event.timestamp() < self.clock.now() {
            return Err(SimError::Clock {
                now: self.clock.now(),
                target: event.timestamp(),
            });
        }
        let key = (event.timestamp(), self.next_seq);
        self.next_seq += 1;
        self.injections.insert(key, Injection { target, event });
        Ok(())
    }

    /// Reads a model's time advance.
    pub fn advance_clock(&self, model_id: &str) -> Result<TimeAdvance, SimError> {
        let idx = self.lookup(model_id)?;
        Ok(self.models[idx].time_advance())
    }

    /// Steps one model if its time advance is zero and fans the produced
    /// event out to subscribers.
    ///
    /// Returns `None` when the model had nothing to do.
    ///
    /// # Errors
    ///
    /// Propagates model and delivery errors.
    pub fn step(&mut self, model_id: &str) -> Result<Option<Event<K>>, SimError> {
        let idx = self.lookup(model_id)?;
        if !self.models[idx].time_advance().is_immediate() {
            return Ok(None);
        }
        let event = self.fire(idx)?;
        self.fan_out(idx, &event)?;
        Ok(Some(event))
    }

    /// Steps imminent models in waves until every model is passive.
    ///
    /// # Errors
    ///
    /// Propagates model errors, or `SimError::Aborted` when a run limit
    /// is hit.
    pub fn settle(&mut self) -> Result<(), SimError> {
        loop {
            let ready: Vec<usize> = (0..self.models.len())
                .filter(|&i| self.models[i].time_advance().is_immediate())
                .collect();
            if ready.is_empty() {
                return Ok(());
            }

            let mut produced = Vec::with_capacity(ready.len());
            for idx in ready {
                if let Some(reason) = self.limit_hit() {
                    return Err(self.abort(reason, produced.len()));
                }
                let event = self.fire(idx)?;
                produced.push((idx, event));
            }
            for (idx, event) in produced {
                self.fan_out(idx, &event)?;
            }
        }
    }

    /// Runs the network until no scheduled injection remains at or before
    /// `end`, then leaves the clock at `end`.
    ///
    /// # Errors
    ///
    /// Returns the first model error, or `SimError::Aborted` if a run limit
    /// is hit. On abort every buffered event is dropped unapplied.
    pub fn run_until(&mut self, end: SimTime) -> Result<RunSummary, SimError> {
        if !self.initialized {
            return Err(SimError::Configuration(
                "run started before initialization".to_string(),
            ));
        }
        if end < self.clock.now() {
            return Err(SimError::Clock {
                now: self.clock.now(),
                target: end,
            });
        }
        self.wall_start.get_or_insert_with(Instant::now);
        info!(from = %self.clock.now(), to = %end, "run started");

        self.settle()?;
        while let Some(next) = self.next_injection_time() {
            if next > end {
                break;
            }
            let jump = self.clock.advance_to(next)?;
            self.pace(jump)?;

            while let Some(entry) = self.injections.first_entry() {
                if entry.key().0 != next {
                    break;
                }
                let Injection { target, event } = entry.remove();
                self.models[target].receive_external(event)?;
            }
            self.settle()?;
        }

        let jump = self.clock.advance_to(end)?;
        self.pace(jump)?;
        info!(at = %end, steps = self.steps, "run finished");
        Ok(RunSummary {
            ended_at: end,
            steps: self.steps,
        })
    }

    /// Finalizes every model still running.
    ///
    /// # Errors
    ///
    /// Propagates the first model error.
    pub fn finalize(&mut self, end: SimTime) -> Result<(), SimError> {
        if end >= self.clock.now() {
            self.clock.advance_to(end)?;
        }
        for model in &mut self.models {
            if model.phase() != Phase::Terminal {
                model.finalize(end)?;
            }
        }
        Ok(())
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Produced events, in production order.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Takes the trace, leaving it empty.
    pub fn take_trace(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.trace)
    }

    /// Current state label of `model_id`.
    pub fn state_of(&self, model_id: &str) -> Option<&'static str> {
        self.index
            .get(model_id)
            .map(|&idx| self.models[idx].state_label())
    }

    /// Lifecycle phase of `model_id`.
    pub fn phase_of(&self, model_id: &str) -> Option<Phase> {
        self.index.get(model_id).map(|&idx| self.models[idx].phase())
    }

    /// Number of injections still waiting for their time.
    pub fn pending_injections(&self) -> usize {
        self.injections.len()
    }

    fn lookup(&self, model_id: &str) -> Result<usize, SimError> {
        self.index
            .get(model_id)
            .copied()
            .ok_or_else(|| SimError::UnknownModel(model_id.to_string()))
    }

    fn next_injection_time(&self) -> Option<SimTime> {
        self.injections.keys().next().map(|(at, _)| *at)
    }

    fn fire(&mut self, idx: usize) -> Result<Event<K>, SimError> {
        let model = &mut self.models[idx];
        model.internal_transition()?;
        let event = model.output()?;
        self.steps += 1;
        self.trace.push(TraceEntry {
            at: event.timestamp(),
            model: model.id().to_string(),
            hierarchy: model.hierarchy().to_string(),
            role: model.role(),
            kind: event.kind().name(),
            state: model.state_label(),
            payload: event.payload(),
        });
        Ok(event)
    }

    fn fan_out(&mut self, producer: usize, event: &Event<K>) -> Result<(), SimError> {
        let targets: Vec<usize> = self
            .subscriptions
            .iter()
            .filter(|s| s.source == producer && s.kind == event.kind())
            .map(|s| s.target)
            .collect();
        for target in targets {
            debug!(
                from = self.models[producer].id(),
                to = self.models[target].id(),
                kind = event.kind().name(),
                at = %event.timestamp(),
                "delivering"
            );
            self.models[target].receive_external(event.clone())?;
        }
        Ok(())
    }

    fn limit_hit(&self) -> Option<String> {
        if let Some(max) = self.limits.max_steps {
            if self.steps >= max {
                return Some(format!("step budget of {max} exhausted"));
            }
        }
        self.deadline_hit()
    }

    fn deadline_hit(&self) -> Option<String> {
        match self.wall_time_left() {
            Some(left) if left.is_zero() => Some(format!(
                "wall-clock deadline of {:?} passed",
                self.limits.wall_deadline.unwrap_or_default()
            )),
            _ => None,
        }
    }

    /// Wall time left before the deadline, `None` without one.
    fn wall_time_left(&self) -> Option<Duration> {
        let deadline = self.limits.wall_deadline?;
        let elapsed = self.wall_start.map_or(Duration::ZERO, |start| start.elapsed());
        Some(deadline.saturating_sub(elapsed))
    }

    fn abort(&mut self, reason: String, in_flight: usize) -> SimError {
        let mut discarded = in_flight + self.injections.len();
        self.injections.clear();
        for model in &mut self.models {
            discarded += model.discard_pending();
        }
        warn!(at = %self.clock.now(), %reason, discarded, "run aborted");
        SimError::Aborted {
            at: self.clock.now(),
            reason,
            discarded,
        }
    }

    /// Sleeps for `jump` scaled by the acceleration, never past the wall
    /// deadline, then aborts if the deadline has passed.
    fn pace(&mut self, jump: Duration) -> Result<(), SimError> {
        if let Some(factor) = self.limits.acceleration {
            if factor > 0.0 && !jump.is_zero() {
                // Too large for a Duration means "longer than any deadline".
                let wanted = Duration::try_from_secs_f64(jump.as_secs_f64() / factor)
                    .unwrap_or(Duration::MAX);
                let nap = self.wall_time_left().map_or(wanted, |left| wanted.min(left));
                thread::sleep(nap);
            }
        }
        match self.deadline_hit() {
            Some(reason) => Err(self.abort(reason, 0)),
            None => Ok(()),
        }
    }
}
