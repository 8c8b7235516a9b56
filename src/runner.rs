//! Builds and runs one model network per appliance, then merges the results
//! at the household meter.
//!
//! Each appliance gets its own hierarchy holding the device model and a
//! bridge. The bridge relays every applied command to a mirror model in the
//! meter hierarchy, which owns the recompute channel feeding the appliance's
//! [`ConsumptionModel`].

use std::sync::mpsc;

use tracing::info;

use crate::config::{ApplianceConfig, ScenarioConfig, SimulationConfig};
use crate::devices::consumption::{ConsumptionModel, PowerRating, PowerSegment};
use crate::devices::hair_dryer::HairDryer;
use crate::devices::heater::Heater;
use crate::devices::usage::{UsagePattern, UsageProfile, generate_sessions};
use crate::devices::washing_machine::WashingMachine;
use crate::devices::wind_turbine::WindTurbine;
use crate::error::SimError;
use crate::sim::bridge::BridgeModel;
use crate::sim::event::{EventKind, Payload};
use crate::sim::kpi::KpiReport;
use crate::sim::meter::{ElectricMeter, MeterReading};
use crate::sim::model::{AtomicModel, IntakePolicy, ModelContext};
use crate::sim::scheduler::{RunLimits, Scheduler, TraceEntry};
use crate::sim::script::CommandScript;
use crate::sim::time::SimTime;
use crate::sim::transition::DeviceFamily;

/// Hierarchy the meter-side mirror models live in.
pub const METER_HIERARCHY: &str = "electric-meter";

/// Seed stride between appliances to avoid correlated usage sessions.
const APPLIANCE_SEED_STRIDE: u64 = 7919;

/// Run parameters shared by every appliance.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub start: SimTime,
    pub end: SimTime,
    pub intake_policy: IntakePolicy,
    pub limits: RunLimits,
}

impl RunSettings {
    /// # Errors
    ///
    /// Returns `SimError::Configuration` for an unknown intake policy.
    pub fn from_config(sim: &SimulationConfig) -> Result<Self, SimError> {
        let (start, end) = sim.window();
        let intake_policy = sim
            .intake_policy()
            .map_err(|e| SimError::Configuration(e.to_string()))?;
        Ok(Self {
            start,
            end,
            intake_policy,
            limits: sim.run_limits(),
        })
    }
}

/// Outcome of one appliance's run.
#[derive(Debug, Clone)]
pub struct ApplianceRun {
    pub name: String,
    pub family: &'static str,
    /// Events produced by the device, its bridge, and its mirror.
    pub trace: Vec<TraceEntry>,
    /// Power curve seen at the meter.
    pub segments: Vec<PowerSegment>,
    pub consumed_kwh: f64,
    pub produced_kwh: f64,
    /// Mirror state label at the end of the window.
    pub final_state: &'static str,
    pub steps: u64,
}

impl ApplianceRun {
    /// Power drawn at `at` (the last segment starting at or before it).
    pub fn power_at(&self, at: SimTime) -> f64 {
        let idx = self.segments.partition_point(|s| s.from <= at);
        idx.checked_sub(1)
            .map_or(0.0, |i| self.segments[i].watts)
    }
}

/// Outcome of a household run.
#[derive(Debug, Clone)]
pub struct HouseholdRun {
    pub appliances: Vec<ApplianceRun>,
    /// Every produced event, ordered by timestamp.
    pub trace: Vec<TraceEntry>,
    /// One reading per power change point.
    pub readings: Vec<MeterReading>,
    pub kpi: KpiReport,
}

/// Runs one appliance of family `F` through `script`.
///
/// # Errors
///
/// Returns the first model, ordering, or configuration error, or
/// `SimError::Aborted` when a run limit is hit.
pub fn run_appliance<F: PowerRating>(
    name: &str,
    script: CommandScript<F::Kind>,
    settings: &RunSettings,
) -> Result<ApplianceRun, SimError> {
    let bridge_id = format!("{name}-bridge");
    let mirror_id = format!("{name}@meter");
    let (tx, rx) = mpsc::channel();

    let device = AtomicModel::<F>::new(
        name,
        ModelContext::new(name).with_policy(settings.intake_policy),
    )?;
    let bridge = BridgeModel::<F::Kind>::new(&bridge_id, ModelContext::new(name), &mirror_id)?;
    let mirror = AtomicModel::<F>::new(
        &mirror_id,
        ModelContext::new(METER_HIERARCHY).with_policy(settings.intake_policy),
    )?
    .with_recompute_channel(tx);

    let mut scheduler = Scheduler::<F::Kind>::with_limits(settings.limits.clone());
    scheduler.register(device)?;
    scheduler.register(bridge)?;
    scheduler.register(mirror)?;
    scheduler.subscribe_all(name, &bridge_id)?;
    scheduler.subscribe_all(&bridge_id, &mirror_id)?;

    let mut consumption = ConsumptionModel::<F>::new(name, rx, settings.start);

    scheduler.initialize(settings.start)?;
    for event in script.into_events() {
        scheduler.schedule(name, event)?;
    }
    let summary = scheduler.run_until(settings.end)?;
    let final_state = scheduler.state_of(&mirror_id).unwrap_or("unknown");
    scheduler.finalize(settings.end)?;
    consumption.sync(settings.end);

    info!(
        appliance = name,
        family = F::NAME,
        steps = summary.steps,
        consumed_kwh = consumption.consumed_kwh(),
        produced_kwh = consumption.produced_kwh(),
        "appliance run complete"
    );

    Ok(ApplianceRun {
        name: name.to_string(),
        family: F::NAME,
        trace: scheduler.take_trace(),
        segments: consumption.segments().to_vec(),
        consumed_kwh: consumption.consumed_kwh(),
        produced_kwh: consumption.produced_kwh(),
        final_state,
        steps: summary.steps,
    })
}

/// Builds the command script of one configured appliance: scripted commands
/// plus seeded usage sessions.
///
/// # Errors
///
/// Returns `SimError::Configuration` for unknown kinds, bad timestamps, or an
/// invalid usage profile.
pub fn build_script<F: UsagePattern>(
    appliance: &ApplianceConfig,
    settings: &RunSettings,
    seed: u64,
) -> Result<CommandScript<F::Kind>, SimError> {
    let mut script = match &appliance.usage {
        Some(usage) => generate_sessions::<F>(
            &UsageProfile::from(usage),
            settings.start,
            settings.end,
            seed,
        )?,
        None => CommandScript::new(),
    };

    for c in &appliance.commands {
        let kind = F::Kind::parse(&c.kind).ok_or_else(|| {
            SimError::Configuration(format!(
                "appliance `{}`: \"{}\" is not a {} event",
                appliance.name,
                c.kind,
                F::NAME
            ))
        })?;
        let at = SimTime::from_secs_f64(c.at_secs).ok_or_else(|| {
            SimError::Configuration(format!(
                "appliance `{}`: invalid command time {}",
                appliance.name, c.at_secs
            ))
        })?;
        match c.watts {
            Some(watts) => script.push_with_payload(at, kind, Payload::Power { watts }),
            None => script.push(at, kind),
        };
    }

    Ok(script)
}

fn run_configured<F: PowerRating + UsagePattern>(
    appliance: &ApplianceConfig,
    settings: &RunSettings,
    seed: u64,
) -> Result<ApplianceRun, SimError> {
    let script = build_script::<F>(appliance, settings, seed)?;
    run_appliance::<F>(&appliance.name, script, settings)
}

/// Runs every appliance of a scenario and aggregates the household meter.
///
/// # Errors
///
/// Returns `SimError::Configuration` listing every validation error, or the
/// first error raised by any appliance run.
pub fn run_household(cfg: &ScenarioConfig) -> Result<HouseholdRun, SimError> {
    let errors = cfg.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SimError::Configuration(joined));
    }

    let settings = RunSettings::from_config(&cfg.simulation)?;
    info!(
        appliances = cfg.appliances.len(),
        start = %settings.start,
        end = %settings.end,
        "household run started"
    );

    let mut appliances = Vec::with_capacity(cfg.appliances.len());
    for (i, a) in cfg.appliances.iter().enumerate() {
        let seed = cfg
            .simulation
            .seed
            .wrapping_add(APPLIANCE_SEED_STRIDE.wrapping_mul(i as u64 + 1));
        let run = match a.family.as_str() {
            Heater::NAME => run_configured::<Heater>(a, &settings, seed)?,
            HairDryer::NAME => run_configured::<HairDryer>(a, &settings, seed)?,
            WashingMachine::NAME => run_configured::<WashingMachine>(a, &settings, seed)?,
            WindTurbine::NAME => run_configured::<WindTurbine>(a, &settings, seed)?,
            other => {
                return Err(SimError::Configuration(format!(
                    "appliance `{}` has unknown family \"{other}\"",
                    a.name
                )));
            }
        };
        appliances.push(run);
    }

    let mut meter = ElectricMeter::with_limits(
        "household",
        cfg.meter.max_import_kw,
        cfg.meter.max_export_kw,
    );
    let readings = meter_readings(&appliances, &mut meter);

    let mut trace: Vec<TraceEntry> = appliances
        .iter()
        .flat_map(|a| a.trace.iter().cloned())
        .collect();
    trace.sort_by_key(|e| e.at);

    let kpi = KpiReport::from_run(&readings, settings.end, &trace);
    info!(
        readings = readings.len(),
        violations = kpi.limit_violation_count,
        "household run finished"
    );

    Ok(HouseholdRun {
        appliances,
        trace,
        readings,
        kpi,
    })
}

/// Samples the household net power at every instant some appliance's power
/// changes.
pub fn meter_readings(appliances: &[ApplianceRun], meter: &mut ElectricMeter) -> Vec<MeterReading> {
    let mut change_points: Vec<SimTime> = appliances
        .iter()
        .flat_map(|a| a.segments.iter().map(|s| s.from))
        .collect();
    change_points.sort();
    change_points.dedup();

    change_points
        .into_iter()
        .map(|at| {
            meter.reset();
            let mut active = 0;
            for a in appliances {
                let watts = a.power_at(at);
                if watts != 0.0 {
                    active += 1;
                }
                meter.add_watts(watts);
            }
            meter.read(at, active)
        })
        .collect()
}
