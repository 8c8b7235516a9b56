//! Per-family discrete-state transition tables.

use std::fmt::Debug;

use crate::error::SimError;

use super::event::EventKind;

/// Outcome of applying one event kind in one discrete state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Move to `next`. When `recompute` is set, the continuous side must
    /// recompute its derived quantities.
    To { next: S, recompute: bool },
    /// The kind is not applicable in this state.
    Invalid,
}

impl<S: Copy> Transition<S> {
    /// Transition to `next` that requests a recompute.
    pub fn changed(next: S) -> Self {
        Transition::To {
            next,
            recompute: true,
        }
    }

    /// Transition to `next` without a recompute request.
    pub fn silent(next: S) -> Self {
        Transition::To {
            next,
            recompute: false,
        }
    }

    /// Target state, if the transition is valid.
    pub fn target(&self) -> Option<S> {
        match self {
            Transition::To { next, .. } => Some(*next),
            Transition::Invalid => None,
        }
    }
}

/// A device family: its closed state set, its closed event set, and the
/// table that connects them.
///
/// Implementations write [`DeviceFamily::transition`] as an exhaustive `match`
/// over `(state, kind)`, so every pair is either mapped or explicitly
/// [`Transition::Invalid`].
pub trait DeviceFamily: 'static {
    /// Family name used in config files and traces.
    const NAME: &'static str;

    /// Discrete control state.
    type State: Copy + Eq + Debug + Send + 'static;

    /// Event kinds this family reacts to.
    type Kind: EventKind;

    /// Every state in the family.
    const STATES: &'static [Self::State];

    /// State a freshly initialized model starts in.
    fn rest_state() -> Self::State;

    /// Snake-case label for traces and errors.
    fn state_label(state: Self::State) -> &'static str;

    /// The transition table.
    fn transition(state: Self::State, kind: Self::Kind) -> Transition<Self::State>;
}

/// Counts gathered by [`audit_transition_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAudit {
    /// Number of `(state, kind)` pairs with a valid transition.
    pub valid: usize,
    /// Number of pairs explicitly marked invalid.
    pub invalid: usize,
}

/// Walks every `(state, kind)` pair of family `F` and checks the table is
/// well formed.
///
/// # Errors
///
/// Returns `SimError::Configuration` if the rest state or a transition target
/// is missing from `F::STATES`, or if some kind is inapplicable everywhere.
pub fn audit_transition_table<F: DeviceFamily>() -> Result<TableAudit, SimError> {
    if !F::STATES.contains(&F::rest_state()) {
        return Err(SimError::Configuration(format!(
            "{}: rest state `{}` is not listed in STATES",
            F::NAME,
            F::state_label(F::rest_state())
        )));
    }

    let mut audit = TableAudit {
        valid: 0,
        invalid: 0,
    };

    for kind in F::Kind::ALL {
        let mut applicable = false;
        for &state in F::STATES {
            match F::transition(state, *kind) {
                Transition::To { next, .. } => {
                    if !F::STATES.contains(&next) {
                        return Err(SimError::Configuration(format!(
                            "{}: `{}` from `{}` targets an unlisted state",
                            F::NAME,
                            kind.name(),
                            F::state_label(state)
                        )));
                    }
                    applicable = true;
                    audit.valid += 1;
                }
                Transition::Invalid => audit.invalid += 1,
            }
        }
        if !applicable {
            return Err(SimError::Configuration(format!(
                "{}: event `{}` is inapplicable in every state",
                F::NAME,
                kind.name()
            )));
        }
    }

    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::hair_dryer::HairDryer;
    use crate::devices::heater::Heater;
    use crate::devices::washing_machine::WashingMachine;
    use crate::devices::wind_turbine::WindTurbine;

    #[test]
    fn transition_helpers() {
        assert_eq!(Transition::changed(3).target(), Some(3));
        assert_eq!(
            Transition::silent(4),
            Transition::To {
                next: 4,
                recompute: false
            }
        );
        assert_eq!(Transition::<u8>::Invalid.target(), None);
    }

    #[test]
    fn every_shipped_table_passes_the_audit() {
        let heater = audit_transition_table::<Heater>().expect("heater table");
        assert_eq!(heater.valid + heater.invalid, 3 * 5);

        let dryer = audit_transition_table::<HairDryer>().expect("hair dryer table");
        assert_eq!(dryer.valid + dryer.invalid, 3 * 4);

        let washer = audit_transition_table::<WashingMachine>().expect("washer table");
        assert_eq!(washer.valid + washer.invalid, 3 * 4);

        let turbine = audit_transition_table::<WindTurbine>().expect("turbine table");
        assert_eq!(turbine.valid + turbine.invalid, 2 * 2);
    }
}
