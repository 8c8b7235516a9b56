//! Post-hoc KPI computation from a household run.

use std::fmt;

use crate::runner::METER_HIERARCHY;

use super::meter::MeterReading;
use super::model::ModelRole;
use super::scheduler::TraceEntry;
use super::time::SimTime;

/// Aggregate key performance indicators derived from a complete run.
///
/// Computed post hoc from meter readings and the event trace, so the report
/// always agrees with the exported data.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Energy imported from the grid (kWh).
    pub energy_imported_kwh: f64,
    /// Energy exported to the grid (kWh, positive magnitude).
    pub energy_exported_kwh: f64,
    /// Peak import power (kW, positive).
    pub peak_import_kw: f64,
    /// Peak export power (kW, positive magnitude).
    pub peak_export_kw: f64,
    /// Number of readings outside the meter limits.
    pub limit_violation_count: usize,
    /// Simulated time spent outside the meter limits (seconds).
    pub seconds_outside_limits: f64,
    /// Events applied by appliance models. Meter-side mirrors replay the same
    /// events and are not counted.
    pub events_applied: usize,
    /// Events relayed by bridges.
    pub events_relayed: usize,
}

impl KpiReport {
    /// Computes all KPIs.
    ///
    /// # Arguments
    ///
    /// * `readings` - Meter readings in time order; each holds until the next
    /// * `end` - End of the simulated window; the last reading holds until here
    /// * `trace` - Every event produced during the run
    pub fn from_run(readings: &[MeterReading], end: SimTime, trace: &[TraceEntry]) -> Self {
        let mut imported_wh = 0.0_f64;
        let mut exported_wh = 0.0_f64;
        let mut peak_import = 0.0_f64;
        let mut peak_export = 0.0_f64;
        let mut violations = 0_usize;
        let mut outside_secs = 0.0_f64;

        for (i, r) in readings.iter().enumerate() {
            let until = readings.get(i + 1).map_or(end, |next| next.at);
            let secs = until.saturating_since(r.at).as_secs_f64();
            let wh = r.net_watts * secs / 3600.0;
            if wh >= 0.0 {
                imported_wh += wh;
            } else {
                exported_wh -= wh;
            }

            peak_import = peak_import.max(r.net_watts / 1000.0);
            peak_export = peak_export.max(-r.net_watts / 1000.0);

            if !r.within_limits {
                violations += 1;
                outside_secs += secs;
            }
        }

        let events_applied = trace
            .iter()
            .filter(|e| e.role == ModelRole::Device && e.hierarchy != METER_HIERARCHY)
            .count();
        let events_relayed = trace
            .iter()
            .filter(|e| e.role == ModelRole::Bridge)
            .count();

        Self {
            energy_imported_kwh: imported_wh / 1000.0,
            energy_exported_kwh: exported_wh / 1000.0,
            peak_import_kw: peak_import,
            peak_export_kw: peak_export,
            limit_violation_count: violations,
            seconds_outside_limits: outside_secs,
            events_applied,
            events_relayed,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Energy imported:       {:.3} kWh", self.energy_imported_kwh)?;
        writeln!(f, "Energy exported:       {:.3} kWh", self.energy_exported_kwh)?;
        writeln!(f, "Peak import:           {:.2} kW", self.peak_import_kw)?;
        writeln!(f, "Peak export:           {:.2} kW", self.peak_export_kw)?;
        writeln!(
            f,
            "Meter violations:      {} ({:.0} s outside limits)",
            self.limit_violation_count, self.seconds_outside_limits
        )?;
        writeln!(f, "Events applied:        {}", self.events_applied)?;
        write!(f, "Events relayed:        {}", self.events_relayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::Payload;

    fn reading(secs: u64, net_watts: f64, within_limits: bool) -> MeterReading {
        MeterReading {
            at: SimTime::from_secs(secs),
            net_watts,
            active_appliances: 1,
            within_limits,
        }
    }

    fn entry(role: ModelRole, hierarchy: &str) -> TraceEntry {
        TraceEntry {
            at: SimTime::ZERO,
            model: "m".to_string(),
            hierarchy: hierarchy.to_string(),
            role,
            kind: "switch_on",
            state: "on",
            payload: Payload::Empty,
        }
    }

    #[test]
    fn energy_integration() {
        // 2 kW for an hour, then 1 kW export for half an hour.
        let readings = vec![reading(0, 2000.0, true), reading(3600, -1000.0, true)];
        let kpi = KpiReport::from_run(&readings, SimTime::from_secs(5400), &[]);
        assert!((kpi.energy_imported_kwh - 2.0).abs() < 1e-9);
        assert!((kpi.energy_exported_kwh - 0.5).abs() < 1e-9);
    }

    #[test]
    fn peak_import_and_export() {
        let readings = vec![
            reading(0, 3000.0, true),
            reading(10, -2000.0, true),
            reading(20, 5000.0, true),
            reading(30, -1000.0, true),
        ];
        let kpi = KpiReport::from_run(&readings, SimTime::from_secs(40), &[]);
        assert_eq!(kpi.peak_import_kw, 5.0);
        assert_eq!(kpi.peak_export_kw, 2.0);
    }

    #[test]
    fn violation_counting() {
        let readings = vec![
            reading(0, 100.0, true),
            reading(10, 9000.0, false),
            reading(25, 100.0, true),
        ];
        let kpi = KpiReport::from_run(&readings, SimTime::from_secs(30), &[]);
        assert_eq!(kpi.limit_violation_count, 1);
        assert_eq!(kpi.seconds_outside_limits, 15.0);
    }

    #[test]
    fn event_counts_by_role() {
        let trace = vec![
            entry(ModelRole::Device, "heater"),
            entry(ModelRole::Bridge, "heater"),
            entry(ModelRole::Device, "washer"),
        ];
        let kpi = KpiReport::from_run(&[], SimTime::ZERO, &trace);
        assert_eq!(kpi.events_applied, 2);
        assert_eq!(kpi.events_relayed, 1);
    }

    #[test]
    fn mirror_replays_are_not_counted_as_applied() {
        let trace = vec![
            entry(ModelRole::Device, "heater"),
            entry(ModelRole::Bridge, "heater"),
            entry(ModelRole::Device, METER_HIERARCHY),
        ];
        let kpi = KpiReport::from_run(&[], SimTime::ZERO, &trace);
        assert_eq!(kpi.events_applied, 1);
        assert_eq!(kpi.events_relayed, 1);
    }

    #[test]
    fn empty_run() {
        let kpi = KpiReport::from_run(&[], SimTime::from_secs(10), &[]);
        assert_eq!(kpi.energy_imported_kwh, 0.0);
        assert_eq!(kpi.limit_violation_count, 0);
    }
}
