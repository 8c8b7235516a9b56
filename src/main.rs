//! Appliance simulator entry point: CLI wiring and config-driven household run.

use std::path::Path;
use std::process;

use tracing::{error, warn};

use appliance_sim::cli::{self, Command};
use appliance_sim::config::ScenarioConfig;
use appliance_sim::io::export::{export_meter_csv, export_trace_csv};
use appliance_sim::logging::init_tracing;
use appliance_sim::runner::run_household;

/// Exit code for runs stopped by a broken model network rather than a limit.
const EXIT_MODEL_DEFECT: i32 = 3;

fn main() {
    let opts = match cli::parse_args() {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            cli::print_usage();
            return;
        }
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    init_tracing(&opts.log_level);

    // Load config: --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = opts.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = opts.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = opts.seed {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let run = match run_household(&scenario) {
        Ok(run) => run,
        Err(e) if e.is_logic_defect() => {
            error!(error = %e, "simulation failed");
            eprintln!("error: {e}");
            process::exit(EXIT_MODEL_DEFECT);
        }
        Err(e) => {
            warn!(error = %e, "simulation stopped early");
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for e in &run.trace {
        println!(
            "{:>10} {:<24} {:<14} {:<12} -> {}",
            e.at.to_string(),
            e.model,
            e.hierarchy,
            e.kind,
            e.state
        );
    }

    println!();
    for r in &run.readings {
        println!(
            "{:>10} net={:>8.3} kW active={} limit_ok={}",
            r.at.to_string(),
            r.net_watts / 1000.0,
            r.active_appliances,
            r.within_limits
        );
    }

    println!();
    for a in &run.appliances {
        println!(
            "{:<20} {:<16} consumed={:.3} kWh produced={:.3} kWh final={}",
            a.name, a.family, a.consumed_kwh, a.produced_kwh, a.final_state
        );
    }

    println!("\n{}", run.kpi);

    if let Some(ref path) = opts.trace_out {
        if let Err(e) = export_trace_csv(&run.trace, Path::new(path)) {
            eprintln!("error: failed to write trace CSV: {e}");
            process::exit(1);
        }
        eprintln!("Trace written to {}", path.display());
    }

    if let Some(ref path) = opts.meter_out {
        if let Err(e) = export_meter_csv(&run.readings, Path::new(path)) {
            eprintln!("error: failed to write meter CSV: {e}");
            process::exit(1);
        }
        eprintln!("Meter readings written to {}", path.display());
    }
}
