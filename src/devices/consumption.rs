//! Continuous side of an appliance: turns discrete-state changes into a
//! piecewise-constant power curve and integrates it into energy.

use std::marker::PhantomData;
use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::debug;

use crate::sim::event::Payload;
use crate::sim::model::RecomputeNotice;
use crate::sim::time::SimTime;
use crate::sim::transition::DeviceFamily;

/// Electrical rating of a device family.
///
/// # Power Flow Convention (Meter)
/// Consumers return **positive** watts, producers **negative** watts.
pub trait PowerRating: DeviceFamily {
    /// Power drawn (or produced) in `state`.
    ///
    /// # Arguments
    ///
    /// * `state` - Current discrete state
    /// * `setpoint` - Last power request carried by a `Payload::Power`, if any
    fn power_watts(state: Self::State, setpoint: Option<f64>) -> f64;
}

/// A stretch of constant power starting at `from`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSegment {
    pub from: SimTime,
    pub watts: f64,
}

/// Energy bookkeeping for one appliance, fed by recompute notices.
///
/// Owns the receiving end of the channel its atomic model sends on. Notices
/// are drained lazily, so the discrete side never waits on the continuous one.
pub struct ConsumptionModel<F: PowerRating> {
    appliance: String,
    receiver: Receiver<RecomputeNotice<F::State>>,
    state: F::State,
    setpoint: Option<f64>,
    segments: Vec<PowerSegment>,
    synced_to: SimTime,
    consumed_wh: f64,
    produced_wh: f64,
    notices: usize,
    _family: PhantomData<F>,
}

impl<F: PowerRating> ConsumptionModel<F> {
    /// Creates a consumption model starting in the family's rest state at
    /// `start`.
    pub fn new(
        appliance: impl Into<String>,
        receiver: Receiver<RecomputeNotice<F::State>>,
        start: SimTime,
    ) -> Self {
        let state = F::rest_state();
        Self {
            appliance: appliance.into(),
            receiver,
            state,
            setpoint: None,
            segments: vec![PowerSegment {
                from: start,
                watts: F::power_watts(state, None),
            }],
            synced_to: start,
            consumed_wh: 0.0,
            produced_wh: 0.0,
            notices: 0,
            _family: PhantomData,
        }
    }

    pub fn appliance(&self) -> &str {
        &self.appliance
    }

    /// Applies every notice waiting on the channel. Returns how many.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => {
                    self.apply(notice);
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Drains pending notices, then integrates energy up to `until`.
    pub fn sync(&mut self, until: SimTime) {
        self.drain();
        self.integrate_to(until);
    }

    fn apply(&mut self, notice: RecomputeNotice<F::State>) {
        self.integrate_to(notice.at);
        if let Payload::Power { watts } = notice.payload {
            self.setpoint = Some(watts);
        }
        self.state = notice.state;
        self.notices += 1;

        let watts = F::power_watts(self.state, self.setpoint);
        match self.segments.last_mut() {
            Some(last) if last.from == notice.at => last.watts = watts,
            Some(last) if last.watts == watts => {}
            _ => self.segments.push(PowerSegment {
                from: notice.at,
                watts,
            }),
        }
        debug!(
            appliance = %self.appliance,
            at = %notice.at,
            state = F::state_label(self.state),
            watts,
            "power recomputed"
        );
    }

    fn integrate_to(&mut self, until: SimTime) {
        if until <= self.synced_to {
            return;
        }
        let hours = until.saturating_since(self.synced_to).as_secs_f64() / 3600.0;
        let wh = self.power_watts() * hours;
        if wh >= 0.0 {
            self.consumed_wh += wh;
        } else {
            self.produced_wh -= wh;
        }
        self.synced_to = until;
    }

    /// Power at the last applied notice.
    pub fn power_watts(&self) -> f64 {
        F::power_watts(self.state, self.setpoint)
    }

    pub fn state(&self) -> F::State {
        self.state
    }

    /// Power curve so far, one segment per change.
    pub fn segments(&self) -> &[PowerSegment] {
        &self.segments
    }

    /// Energy drawn up to the last sync (kWh).
    pub fn consumed_kwh(&self) -> f64 {
        self.consumed_wh / 1000.0
    }

    /// Energy produced up to the last sync (kWh, positive magnitude).
    pub fn produced_kwh(&self) -> f64 {
        self.produced_wh / 1000.0
    }

    /// Number of notices applied.
    pub fn notices(&self) -> usize {
        self.notices
    }
}
