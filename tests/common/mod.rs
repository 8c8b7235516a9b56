//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use appliance_sim::devices::heater::{Heater, HeaterEvent};
use appliance_sim::sim::bridge::BridgeModel;
use appliance_sim::sim::event::{Event, EventKind};
use appliance_sim::sim::model::{AtomicModel, IntakePolicy, Model, ModelContext};
use appliance_sim::sim::scheduler::{Scheduler, TraceEntry};
use appliance_sim::sim::time::SimTime;
use appliance_sim::sim::transition::{DeviceFamily, Transition};

/// Two-level signal whose events apply in every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEvent {
    High,
    Low,
}

impl EventKind for PulseEvent {
    const ALL: &'static [Self] = &[PulseEvent::High, PulseEvent::Low];

    fn name(&self) -> &'static str {
        match self {
            PulseEvent::High => "high",
            PulseEvent::Low => "low",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            PulseEvent::High => 2,
            PulseEvent::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Idle,
    High,
    Low,
}

/// Permissive family: any event sequence is valid, the state tracks the
/// last applied kind.
pub struct Pulse;

impl DeviceFamily for Pulse {
    const NAME: &'static str = "pulse";
    type State = PulseState;
    type Kind = PulseEvent;
    const STATES: &'static [PulseState] = &[PulseState::Idle, PulseState::High, PulseState::Low];

    fn rest_state() -> PulseState {
        PulseState::Idle
    }

    fn state_label(state: PulseState) -> &'static str {
        match state {
            PulseState::Idle => "idle",
            PulseState::High => "high",
            PulseState::Low => "low",
        }
    }

    fn transition(_state: PulseState, kind: PulseEvent) -> Transition<PulseState> {
        match kind {
            PulseEvent::High => Transition::changed(PulseState::High),
            PulseEvent::Low => Transition::changed(PulseState::Low),
        }
    }
}

pub fn at<K: EventKind>(secs: u64, kind: K) -> Event<K> {
    Event::new(SimTime::from_secs(secs), kind)
}

/// An initialized heater model in hierarchy `house`.
pub fn default_heater(policy: IntakePolicy) -> AtomicModel<Heater> {
    let mut heater = AtomicModel::<Heater>::new(
        "heater",
        ModelContext::new("house").with_policy(policy),
    )
    .expect("valid heater");
    heater.initialize(SimTime::ZERO).expect("initialize");
    heater
}

/// An initialized bridge relaying to `sink`.
pub fn default_bridge<K: EventKind>(sink: &str) -> BridgeModel<K> {
    let mut bridge =
        BridgeModel::<K>::new("bridge", ModelContext::new("house"), sink).expect("valid bridge");
    bridge.initialize(SimTime::ZERO).expect("initialize");
    bridge
}

/// Heater, bridge, and meter-side mirror wired together and initialized at 0.
pub fn heater_network() -> Scheduler<HeaterEvent> {
    let mut scheduler = Scheduler::new();
    scheduler
        .register(AtomicModel::<Heater>::new("heater", ModelContext::new("house")).unwrap())
        .unwrap();
    scheduler
        .register(
            BridgeModel::<HeaterEvent>::new("heater-bridge", ModelContext::new("house"), "mirror")
                .unwrap(),
        )
        .unwrap();
    scheduler
        .register(
            AtomicModel::<Heater>::new(
                "mirror",
                ModelContext::new("meter").with_policy(IntakePolicy::Strict),
            )
            .unwrap(),
        )
        .unwrap();
    scheduler.subscribe_all("heater", "heater-bridge").unwrap();
    scheduler.subscribe_all("heater-bridge", "mirror").unwrap();
    scheduler.initialize(SimTime::ZERO).unwrap();
    scheduler
}

/// Pulse source, bridge, and sink wired together and initialized at 0.
pub fn pulse_network() -> Scheduler<PulseEvent> {
    let mut scheduler = Scheduler::new();
    scheduler
        .register(AtomicModel::<Pulse>::new("source", ModelContext::new("left")).unwrap())
        .unwrap();
    scheduler
        .register(
            BridgeModel::<PulseEvent>::new("bridge", ModelContext::new("left"), "sink").unwrap(),
        )
        .unwrap();
    scheduler
        .register(
            AtomicModel::<Pulse>::new(
                "sink",
                ModelContext::new("right").with_policy(IntakePolicy::Strict),
            )
            .unwrap(),
        )
        .unwrap();
    scheduler.subscribe_all("source", "bridge").unwrap();
    scheduler.subscribe_all("bridge", "sink").unwrap();
    scheduler.initialize(SimTime::ZERO).unwrap();
    scheduler
}

/// `(time, kind)` of every event `model` produced.
pub fn produced_by<'a>(trace: &'a [TraceEntry], model: &str) -> Vec<(SimTime, &'a str)> {
    trace
        .iter()
        .filter(|e| e.model == model)
        .map(|e| (e.at, e.kind))
        .collect()
}

/// Runs one full step (internal transition then output) on any model.
pub fn step<K: EventKind>(model: &mut impl Model<K>) -> Event<K> {
    model.internal_transition().expect("internal transition");
    model.output().expect("output")
}
