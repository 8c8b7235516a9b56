use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use appliance_sim::config::ScenarioConfig;
use appliance_sim::logging::init_test_tracing;
use appliance_sim::runner::{HouseholdRun, run_household};
use appliance_sim::sim::time::SimTime;

fn run_preset(name: &str) -> HouseholdRun {
    init_test_tracing();
    let cfg = ScenarioConfig::from_preset(name).expect("preset loads");
    run_household(&cfg).expect("preset runs")
}

fn run_file(path: &str) -> HouseholdRun {
    init_test_tracing();
    let cfg = ScenarioConfig::from_toml_file(Path::new(path)).expect("scenario parses");
    run_household(&cfg).expect("scenario runs")
}

fn temp_path(label: &str) -> PathBuf {
    env::temp_dir().join(format!("appliance-sim-{}-{label}.csv", std::process::id()))
}

#[test]
fn presets_are_deterministic() {
    for name in ScenarioConfig::PRESETS {
        let a = run_preset(name);
        let b = run_preset(name);
        assert_eq!(a.trace, b.trace, "trace differs for {name}");
        assert_eq!(a.readings, b.readings, "readings differ for {name}");
        assert_eq!(a.kpi, b.kpi, "KPIs differ for {name}");
    }
}

#[test]
fn seed_changes_random_sessions_only() {
    let mut cfg = ScenarioConfig::baseline();
    let a = run_household(&cfg).unwrap();
    cfg.simulation.seed += 1;
    let b = run_household(&cfg).unwrap();

    let scripted = |run: &HouseholdRun| {
        run.appliances
            .iter()
            .find(|a| a.name == "heater")
            .map(|a| a.trace.clone())
            .unwrap()
    };
    assert_eq!(scripted(&a), scripted(&b));
    assert_ne!(a.trace, b.trace, "usage sessions should move with the seed");
}

#[test]
fn busy_evening_heater_resolves_co_timed_commands() {
    let run = run_preset("busy_evening");
    let heater = run.appliances.iter().find(|a| a.name == "heater").unwrap();

    let at_conflict: Vec<_> = heater
        .trace
        .iter()
        .filter(|e| e.model == "heater" && e.at == SimTime::from_secs(65_100))
        .map(|e| (e.kind, e.state))
        .collect();
    assert_eq!(
        at_conflict,
        vec![("begin_heat", "heating"), ("switch_off", "off")]
    );
    assert_eq!(heater.final_state, "off");

    // The meter-side mirror replays the same sequence.
    let mirror: Vec<_> = heater
        .trace
        .iter()
        .filter(|e| e.model == "heater@meter")
        .map(|e| e.kind)
        .collect();
    let device: Vec<_> = heater
        .trace
        .iter()
        .filter(|e| e.model == "heater")
        .map(|e| e.kind)
        .collect();
    assert_eq!(mirror, device);
}

#[test]
fn household_trace_is_time_ordered() {
    let run = run_preset("busy_evening");
    assert!(run.trace.windows(2).all(|w| w[0].at <= w[1].at));
    assert!(!run.readings.is_empty());
}

#[test]
fn morning_scenario_file_runs() {
    let run = run_file("scenarios/morning.toml");
    assert_eq!(run.appliances.len(), 3);

    let heater = run.appliances.iter().find(|a| a.name == "heater").unwrap();
    assert_eq!(heater.final_state, "off");
    // 1 h at 2 kW, then 1 h at the requested 1.2 kW.
    assert!(
        (heater.consumed_kwh - 3.2).abs() < 0.01,
        "heater consumed {:.3} kWh",
        heater.consumed_kwh
    );
    assert!(run.kpi.energy_imported_kwh >= heater.consumed_kwh);
}

#[test]
fn windy_day_exports_and_breaches_limit() {
    let run = run_file("scenarios/windy_day.toml");
    let turbine = run
        .appliances
        .iter()
        .find(|a| a.name == "wind_turbine")
        .unwrap();
    assert!((turbine.produced_kwh - 9.0).abs() < 0.01);
    assert!(run.kpi.energy_exported_kwh > 0.0);
    assert!(run.kpi.limit_violation_count >= 1);
    assert!((run.kpi.peak_export_kw - 1.8).abs() < 1e-9);
}

#[test]
fn strict_scenario_rejects_co_timed_commands() {
    let cfg = ScenarioConfig::from_toml_file(Path::new("scenarios/strict_conflict.toml")).unwrap();
    assert!(cfg.validate().is_empty());
    assert!(run_household(&cfg).is_err());
}

#[test]
fn cli_runs_preset_and_writes_csv() {
    let trace_path = temp_path("trace");
    let meter_path = temp_path("meter");

    let output = Command::new(env!("CARGO_BIN_EXE_appliance-sim"))
        .args(["--preset", "busy_evening", "--trace-out"])
        .arg(&trace_path)
        .arg("--meter-out")
        .arg(&meter_path)
        .output()
        .expect("appliance-sim process should run");

    assert!(
        output.status.success(),
        "preset run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("--- KPI Report ---"));
    assert!(stdout.contains("heater@meter"));

    let trace_csv = fs::read_to_string(&trace_path).expect("trace CSV written");
    assert!(trace_csv.starts_with("time_s,model,hierarchy,role,kind,state,payload"));
    let meter_csv = fs::read_to_string(&meter_path).expect("meter CSV written");
    assert!(meter_csv.starts_with("time_s,net_kw,active_appliances,limit_ok"));

    let _ = fs::remove_file(trace_path);
    let _ = fs::remove_file(meter_path);
}

#[test]
fn cli_fails_on_strict_conflict() {
    let output = Command::new(env!("CARGO_BIN_EXE_appliance-sim"))
        .args(["--scenario", "scenarios/strict_conflict.toml"])
        .output()
        .expect("appliance-sim process should run");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_reports_step_budget_abort_as_run_failure() {
    let mut scenario = fs::read_to_string("scenarios/windy_day.toml").unwrap();
    scenario = scenario.replace("seed = 11", "seed = 11\nmax_steps = 2");
    let path = env::temp_dir().join(format!("appliance-sim-{}-budget.toml", std::process::id()));
    fs::write(&path, scenario).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_appliance-sim"))
        .arg("--scenario")
        .arg(&path)
        .output()
        .expect("appliance-sim process should run");
    let _ = fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("aborted"), "stderr={stderr}");
}

#[test]
fn kpi_counts_each_command_once() {
    let run = run_preset("busy_evening");
    let commands: usize = run
        .appliances
        .iter()
        .map(|a| a.trace.iter().filter(|e| e.model == a.name).count())
        .sum();
    assert_eq!(run.kpi.events_applied, commands);
    assert_eq!(run.kpi.events_relayed, commands);
}

#[test]
fn cli_rejects_unknown_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_appliance-sim"))
        .arg("--bogus")
        .output()
        .expect("appliance-sim process should run");
    assert_eq!(output.status.code(), Some(2));
}
