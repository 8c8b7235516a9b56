//! Small residential wind turbine. Produces power, so its rating is negative.

use crate::devices::consumption::PowerRating;
use crate::devices::usage::UsagePattern;
use crate::sim::event::EventKind;
use crate::sim::transition::{DeviceFamily, Transition};

/// Output when producing without a setpoint (W, magnitude).
pub const RATED_OUTPUT_WATTS: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindTurbineState {
    Stopped,
    Producing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindTurbineEvent {
    StartUse,
    StopUse,
}

impl EventKind for WindTurbineEvent {
    const ALL: &'static [Self] = &[WindTurbineEvent::StartUse, WindTurbineEvent::StopUse];

    fn name(&self) -> &'static str {
        match self {
            WindTurbineEvent::StartUse => "start_use",
            WindTurbineEvent::StopUse => "stop_use",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            WindTurbineEvent::StartUse => 2,
            WindTurbineEvent::StopUse => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindTurbine;

impl DeviceFamily for WindTurbine {
    const NAME: &'static str = "wind_turbine";
    type State = WindTurbineState;
    type Kind = WindTurbineEvent;
    const STATES: &'static [WindTurbineState] =
        &[WindTurbineState::Stopped, WindTurbineState::Producing];

    fn rest_state() -> WindTurbineState {
        WindTurbineState::Stopped
    }

    fn state_label(state: WindTurbineState) -> &'static str {
        match state {
            WindTurbineState::Stopped => "stopped",
            WindTurbineState::Producing => "producing",
        }
    }

    fn transition(state: WindTurbineState, kind: WindTurbineEvent) -> Transition<WindTurbineState> {
        use WindTurbineEvent as E;
        use WindTurbineState as S;

        match (state, kind) {
            (S::Stopped, E::StartUse) => Transition::changed(S::Producing),
            (S::Producing, E::StopUse) => Transition::changed(S::Stopped),
            (S::Stopped, E::StopUse) | (S::Producing, E::StartUse) => Transition::Invalid,
        }
    }
}

impl PowerRating for WindTurbine {
    /// Negative while producing. A setpoint overrides the rated output
    /// magnitude (its sign is ignored).
    fn power_watts(state: WindTurbineState, setpoint: Option<f64>) -> f64 {
        match state {
            WindTurbineState::Stopped => 0.0,
            WindTurbineState::Producing => -setpoint.map_or(RATED_OUTPUT_WATTS, f64::abs),
        }
    }
}

impl UsagePattern for WindTurbine {
    const SESSION: &'static [WindTurbineEvent] =
        &[WindTurbineEvent::StartUse, WindTurbineEvent::StopUse];
}
