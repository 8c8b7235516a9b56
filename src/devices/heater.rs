//! Space heater: a thermostat-driven heating element behind a power switch.

use crate::devices::consumption::PowerRating;
use crate::devices::usage::UsagePattern;
use crate::sim::event::EventKind;
use crate::sim::transition::{DeviceFamily, Transition};

/// Heating element power when no setpoint has been requested (W).
pub const DEFAULT_HEATING_WATTS: f64 = 2000.0;

/// Control electronics and fan while switched on but not heating (W).
pub const STANDBY_WATTS: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaterState {
    Off,
    On,
    Heating,
}

/// Heater commands, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaterEvent {
    SwitchOn,
    BeginHeat,
    EndHeat,
    /// Changes the heating power; carries `Payload::Power`.
    SetPower,
    SwitchOff,
}

impl EventKind for HeaterEvent {
    const ALL: &'static [Self] = &[
        HeaterEvent::SwitchOn,
        HeaterEvent::BeginHeat,
        HeaterEvent::EndHeat,
        HeaterEvent::SetPower,
        HeaterEvent::SwitchOff,
    ];

    fn name(&self) -> &'static str {
        match self {
            HeaterEvent::SwitchOn => "switch_on",
            HeaterEvent::BeginHeat => "begin_heat",
            HeaterEvent::EndHeat => "end_heat",
            HeaterEvent::SetPower => "set_power",
            HeaterEvent::SwitchOff => "switch_off",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            HeaterEvent::SwitchOn => 5,
            HeaterEvent::BeginHeat => 4,
            HeaterEvent::EndHeat => 3,
            HeaterEvent::SetPower => 2,
            HeaterEvent::SwitchOff => 1,
        }
    }
}

/// The heater family.
///
/// ```text
///            switch_on          begin_heat
///   Off ───────────────► On ───────────────► Heating
///    ▲                   │ ◄─────────────── │
///    └─── switch_off ────┴──── end_heat ────┘ (switch_off from Heating too)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Heater;

impl DeviceFamily for Heater {
    const NAME: &'static str = "heater";
    type State = HeaterState;
    type Kind = HeaterEvent;
    const STATES: &'static [HeaterState] =
        &[HeaterState::Off, HeaterState::On, HeaterState::Heating];

    fn rest_state() -> HeaterState {
        HeaterState::Off
    }

    fn state_label(state: HeaterState) -> &'static str {
        match state {
            HeaterState::Off => "off",
            HeaterState::On => "on",
            HeaterState::Heating => "heating",
        }
    }

    fn transition(state: HeaterState, kind: HeaterEvent) -> Transition<HeaterState> {
        use HeaterEvent as E;
        use HeaterState as S;

        match (state, kind) {
            (S::Off, E::SwitchOn) => Transition::changed(S::On),
            (S::Off, E::BeginHeat | E::EndHeat | E::SetPower | E::SwitchOff) => Transition::Invalid,

            (S::On, E::BeginHeat) => Transition::changed(S::Heating),
            (S::On, E::SetPower) => Transition::changed(S::On),
            (S::On, E::SwitchOff) => Transition::changed(S::Off),
            (S::On, E::SwitchOn | E::EndHeat) => Transition::Invalid,

            (S::Heating, E::EndHeat) => Transition::changed(S::On),
            (S::Heating, E::SetPower) => Transition::changed(S::Heating),
            (S::Heating, E::SwitchOff) => Transition::changed(S::Off),
            (S::Heating, E::SwitchOn | E::BeginHeat) => Transition::Invalid,
        }
    }
}

impl PowerRating for Heater {
    fn power_watts(state: HeaterState, setpoint: Option<f64>) -> f64 {
        match state {
            HeaterState::Off => 0.0,
            HeaterState::On => STANDBY_WATTS,
            HeaterState::Heating => setpoint.unwrap_or(DEFAULT_HEATING_WATTS).max(0.0),
        }
    }
}

impl UsagePattern for Heater {
    const SESSION: &'static [HeaterEvent] = &[
        HeaterEvent::SwitchOn,
        HeaterEvent::BeginHeat,
        HeaterEvent::EndHeat,
        HeaterEvent::SwitchOff,
    ];
}
