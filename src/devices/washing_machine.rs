//! Washing machine with a wash cycle that can be started and stopped while
//! the machine is powered.

use crate::devices::consumption::PowerRating;
use crate::devices::usage::UsagePattern;
use crate::sim::event::EventKind;
use crate::sim::transition::{DeviceFamily, Transition};

pub const STANDBY_WATTS: f64 = 5.0;
pub const WASHING_WATTS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WashingMachineState {
    Off,
    On,
    Washing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WashingMachineEvent {
    SwitchOn,
    StartUse,
    StopUse,
    SwitchOff,
}

impl EventKind for WashingMachineEvent {
    const ALL: &'static [Self] = &[
        WashingMachineEvent::SwitchOn,
        WashingMachineEvent::StartUse,
        WashingMachineEvent::StopUse,
        WashingMachineEvent::SwitchOff,
    ];

    fn name(&self) -> &'static str {
        match self {
            WashingMachineEvent::SwitchOn => "switch_on",
            WashingMachineEvent::StartUse => "start_use",
            WashingMachineEvent::StopUse => "stop_use",
            WashingMachineEvent::SwitchOff => "switch_off",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            WashingMachineEvent::SwitchOn => 4,
            WashingMachineEvent::StartUse => 3,
            WashingMachineEvent::StopUse => 2,
            WashingMachineEvent::SwitchOff => 1,
        }
    }
}

/// The washing machine family.
///
/// Switching off mid-wash is allowed and aborts the cycle.
#[derive(Debug, Clone, Copy)]
pub struct WashingMachine;

impl DeviceFamily for WashingMachine {
    const NAME: &'static str = "washing_machine";
    type State = WashingMachineState;
    type Kind = WashingMachineEvent;
    const STATES: &'static [WashingMachineState] = &[
        WashingMachineState::Off,
        WashingMachineState::On,
        WashingMachineState::Washing,
    ];

    fn rest_state() -> WashingMachineState {
        WashingMachineState::Off
    }

    fn state_label(state: WashingMachineState) -> &'static str {
        match state {
            WashingMachineState::Off => "off",
            WashingMachineState::On => "on",
            WashingMachineState::Washing => "washing",
        }
    }

    fn transition(
        state: WashingMachineState,
        kind: WashingMachineEvent,
    ) -> Transition<WashingMachineState> {
        use WashingMachineEvent as E;
        use WashingMachineState as S;

        match (state, kind) {
            (S::Off, E::SwitchOn) => Transition::changed(S::On),
            (S::Off, E::StartUse | E::StopUse | E::SwitchOff) => Transition::Invalid,

            (S::On, E::StartUse) => Transition::changed(S::Washing),
            (S::On, E::SwitchOff) => Transition::changed(S::Off),
            (S::On, E::SwitchOn | E::StopUse) => Transition::Invalid,

            (S::Washing, E::StopUse) => Transition::changed(S::On),
            (S::Washing, E::SwitchOff) => Transition::changed(S::Off),
            (S::Washing, E::SwitchOn | E::StartUse) => Transition::Invalid,
        }
    }
}

impl PowerRating for WashingMachine {
    fn power_watts(state: WashingMachineState, _setpoint: Option<f64>) -> f64 {
        match state {
            WashingMachineState::Off => 0.0,
            WashingMachineState::On => STANDBY_WATTS,
            WashingMachineState::Washing => WASHING_WATTS,
        }
    }
}

impl UsagePattern for WashingMachine {
    const SESSION: &'static [WashingMachineEvent] = &[
        WashingMachineEvent::SwitchOn,
        WashingMachineEvent::StartUse,
        WashingMachineEvent::StopUse,
        WashingMachineEvent::SwitchOff,
    ];
}
