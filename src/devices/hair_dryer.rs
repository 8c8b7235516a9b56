//! Two-speed hair dryer.

use crate::devices::consumption::PowerRating;
use crate::devices::usage::UsagePattern;
use crate::sim::event::EventKind;
use crate::sim::transition::{DeviceFamily, Transition};

pub const LOW_WATTS: f64 = 660.0;
pub const HIGH_WATTS: f64 = 1100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HairDryerState {
    Off,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HairDryerEvent {
    SwitchOn,
    SetHigh,
    SetLow,
    SwitchOff,
}

impl EventKind for HairDryerEvent {
    const ALL: &'static [Self] = &[
        HairDryerEvent::SwitchOn,
        HairDryerEvent::SetHigh,
        HairDryerEvent::SetLow,
        HairDryerEvent::SwitchOff,
    ];

    fn name(&self) -> &'static str {
        match self {
            HairDryerEvent::SwitchOn => "switch_on",
            HairDryerEvent::SetHigh => "set_high",
            HairDryerEvent::SetLow => "set_low",
            HairDryerEvent::SwitchOff => "switch_off",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            HairDryerEvent::SwitchOn => 4,
            HairDryerEvent::SetHigh => 3,
            HairDryerEvent::SetLow => 2,
            HairDryerEvent::SwitchOff => 1,
        }
    }
}

/// The hair dryer family. Switching on starts at low speed.
#[derive(Debug, Clone, Copy)]
pub struct HairDryer;

impl DeviceFamily for HairDryer {
    const NAME: &'static str = "hair_dryer";
    type State = HairDryerState;
    type Kind = HairDryerEvent;
    const STATES: &'static [HairDryerState] = &[
        HairDryerState::Off,
        HairDryerState::Low,
        HairDryerState::High,
    ];

    fn rest_state() -> HairDryerState {
        HairDryerState::Off
    }

    fn state_label(state: HairDryerState) -> &'static str {
        match state {
            HairDryerState::Off => "off",
            HairDryerState::Low => "low",
            HairDryerState::High => "high",
        }
    }

    fn transition(state: HairDryerState, kind: HairDryerEvent) -> Transition<HairDryerState> {
        use HairDryerEvent as E;
        use HairDryerState as S;

        match (state, kind) {
            (S::Off, E::SwitchOn) => Transition::changed(S::Low),
            (S::Off, E::SetHigh | E::SetLow | E::SwitchOff) => Transition::Invalid,

            (S::Low, E::SetHigh) => Transition::changed(S::High),
            (S::Low, E::SwitchOff) => Transition::changed(S::Off),
            (S::Low, E::SwitchOn | E::SetLow) => Transition::Invalid,

            (S::High, E::SetLow) => Transition::changed(S::Low),
            (S::High, E::SwitchOff) => Transition::changed(S::Off),
            (S::High, E::SwitchOn | E::SetHigh) => Transition::Invalid,
        }
    }
}

impl PowerRating for HairDryer {
    fn power_watts(state: HairDryerState, _setpoint: Option<f64>) -> f64 {
        match state {
            HairDryerState::Off => 0.0,
            HairDryerState::Low => LOW_WATTS,
            HairDryerState::High => HIGH_WATTS,
        }
    }
}

impl UsagePattern for HairDryer {
    const SESSION: &'static [HairDryerEvent] = &[
        HairDryerEvent::SwitchOn,
        HairDryerEvent::SetHigh,
        HairDryerEvent::SetLow,
        HairDryerEvent::SwitchOff,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::check_priority_order;

    #[test]
    fn priority_relation_is_a_total_order() {
        assert!(check_priority_order::<HairDryerEvent>().is_ok());
    }

    #[test]
    fn speed_changes() {
        assert_eq!(
            HairDryer::transition(HairDryerState::Low, HairDryerEvent::SetHigh).target(),
            Some(HairDryerState::High)
        );
        assert_eq!(
            HairDryer::transition(HairDryerState::High, HairDryerEvent::SetLow).target(),
            Some(HairDryerState::Low)
        );
        assert_eq!(
            HairDryer::transition(HairDryerState::High, HairDryerEvent::SetHigh),
            Transition::Invalid
        );
    }

    #[test]
    fn cannot_change_speed_while_off() {
        for kind in [HairDryerEvent::SetHigh, HairDryerEvent::SetLow] {
            assert_eq!(
                HairDryer::transition(HairDryerState::Off, kind),
                Transition::Invalid
            );
        }
    }

    #[test]
    fn high_draws_more_than_low() {
        let low = HairDryer::power_watts(HairDryerState::Low, None);
        let high = HairDryer::power_watts(HairDryerState::High, None);
        assert!(high > low);
        assert_eq!(HairDryer::power_watts(HairDryerState::Off, None), 0.0);
    }
}
