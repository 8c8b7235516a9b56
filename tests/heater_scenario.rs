//! The switch-on / co-timed begin-heat and switch-off heater scenario, run
//! both against a bare model and through the scheduler.

mod common;

use std::sync::mpsc;

use appliance_sim::devices::heater::{Heater, HeaterEvent, HeaterState};
use appliance_sim::logging::init_test_tracing;
use appliance_sim::sim::model::{AtomicModel, IntakePolicy, Model, ModelContext};
use appliance_sim::sim::time::SimTime;
use common::{at, default_heater, heater_network, produced_by, step};

#[test]
fn switch_on_then_co_timed_heat_and_off() {
    init_test_tracing();
    let (tx, rx) = mpsc::channel();
    let mut heater = AtomicModel::<Heater>::new("heater", ModelContext::new("house"))
        .unwrap()
        .with_recompute_channel(tx);
    heater.initialize(SimTime::ZERO).unwrap();
    assert_eq!(heater.state(), HeaterState::Off);

    heater.receive_external(at(0, HeaterEvent::SwitchOn)).unwrap();
    let out = step(&mut heater);
    assert_eq!(out, at(0, HeaterEvent::SwitchOn));
    assert_eq!(heater.state(), HeaterState::On);
    let changed = rx.try_recv().expect("value-changed notice");
    assert_eq!(changed.state, HeaterState::On);

    // Delivered back to back before the next step.
    heater.receive_external(at(5, HeaterEvent::BeginHeat)).unwrap();
    heater.receive_external(at(5, HeaterEvent::SwitchOff)).unwrap();

    let out = step(&mut heater);
    assert_eq!(out, at(5, HeaterEvent::BeginHeat));
    assert_eq!(heater.state(), HeaterState::Heating);

    let out = step(&mut heater);
    assert_eq!(out, at(5, HeaterEvent::SwitchOff));
    assert_eq!(heater.state(), HeaterState::Off);

    assert_eq!(
        heater.history(),
        &[HeaterState::On, HeaterState::Heating, HeaterState::Off]
    );
    let notices: Vec<_> = rx.try_iter().map(|n| (n.at, n.state)).collect();
    assert_eq!(
        notices,
        vec![
            (SimTime::from_secs(5), HeaterState::Heating),
            (SimTime::from_secs(5), HeaterState::Off),
        ]
    );
}

#[test]
fn delivery_order_does_not_matter_for_co_timed_events() {
    let mut a = default_heater(IntakePolicy::PriorityOrdered);
    let mut b = default_heater(IntakePolicy::PriorityOrdered);
    for m in [&mut a, &mut b] {
        m.receive_external(at(0, HeaterEvent::SwitchOn)).unwrap();
        step(m);
    }

    a.receive_external(at(5, HeaterEvent::BeginHeat)).unwrap();
    a.receive_external(at(5, HeaterEvent::SwitchOff)).unwrap();
    b.receive_external(at(5, HeaterEvent::SwitchOff)).unwrap();
    b.receive_external(at(5, HeaterEvent::BeginHeat)).unwrap();

    let outs_a: Vec<_> = (0..2).map(|_| step(&mut a)).collect();
    let outs_b: Vec<_> = (0..2).map(|_| step(&mut b)).collect();
    assert_eq!(outs_a, outs_b);
    assert_eq!(a.history(), b.history());
}

#[test]
fn consumed_event_is_never_output_again() {
    let mut heater = default_heater(IntakePolicy::PriorityOrdered);
    heater.receive_external(at(0, HeaterEvent::SwitchOn)).unwrap();
    heater.receive_external(at(1, HeaterEvent::BeginHeat)).unwrap();

    assert_eq!(step(&mut heater).kind(), HeaterEvent::SwitchOn);
    assert_eq!(step(&mut heater).kind(), HeaterEvent::BeginHeat);
    assert!(heater.time_advance().is_infinite());
    assert!(heater.output().is_err());
}

#[test]
fn scenario_through_scheduler_reaches_meter_mirror() {
    init_test_tracing();
    let mut scheduler = heater_network();
    scheduler.schedule("heater", at(0, HeaterEvent::SwitchOn)).unwrap();
    scheduler.schedule("heater", at(5, HeaterEvent::SwitchOff)).unwrap();
    scheduler.schedule("heater", at(5, HeaterEvent::BeginHeat)).unwrap();
    scheduler.run_until(SimTime::from_secs(10)).unwrap();

    let expected = vec![
        (SimTime::from_secs(0), "switch_on"),
        (SimTime::from_secs(5), "begin_heat"),
        (SimTime::from_secs(5), "switch_off"),
    ];
    assert_eq!(produced_by(scheduler.trace(), "heater"), expected);
    assert_eq!(produced_by(scheduler.trace(), "heater-bridge"), expected);
    assert_eq!(produced_by(scheduler.trace(), "mirror"), expected);

    // Observers only ever see valid states after each step.
    let mirror_states: Vec<_> = scheduler
        .trace()
        .iter()
        .filter(|e| e.model == "mirror")
        .map(|e| e.state)
        .collect();
    assert_eq!(mirror_states, vec!["on", "heating", "off"]);
    assert_eq!(scheduler.state_of("mirror"), Some("off"));
}
