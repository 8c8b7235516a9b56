use std::env;
use std::path::PathBuf;

use crate::logging::DEFAULT_LEVEL;

/// Parsed command-line options.
#[derive(Debug)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub trace_out: Option<PathBuf>,
    pub meter_out: Option<PathBuf>,
    pub log_level: String,
}

/// What the binary should do.
#[derive(Debug)]
pub enum Command {
    Run(CliOptions),
    Help,
}

pub fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

pub fn parse_args_from(args: Vec<String>) -> Result<Command, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut preset = None;
    let mut seed = None;
    let mut trace_out = None;
    let mut meter_out = None;
    let mut log_level = None;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                seed = Some(value);
            }
            "--trace-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --trace-out (expected a file path)",
                )?;
                if trace_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--trace-out provided more than once".to_string());
                }
            }
            "--meter-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --meter-out (expected a file path)",
                )?;
                if meter_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--meter-out provided more than once".to_string());
                }
            }
            "--log-level" => {
                i += 1;
                let level = args.next_or_err(
                    i,
                    "missing value for --log-level (e.g. info, debug)",
                )?;
                log_level = Some(level.to_string());
            }
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if scenario.is_some() && preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(Command::Run(CliOptions {
        scenario,
        preset,
        seed,
        trace_out,
        meter_out,
        log_level: log_level.unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
    }))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("appliance-sim: discrete-event household appliance simulator");
    eprintln!();
    eprintln!("Usage: appliance-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>     Load scenario from TOML config file");
    eprintln!("  --preset <name>       Use a built-in preset (baseline, busy_evening)");
    eprintln!("  --seed <u64>          Override random seed");
    eprintln!("  --trace-out <path>    Export the event trace to CSV");
    eprintln!("  --meter-out <path>    Export meter readings to CSV");
    eprintln!(
        "  --log-level <filter>  Log filter when RUST_LOG is unset (default: {DEFAULT_LEVEL})"
    );
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!();
    eprintln!("Exit codes: 1 invalid scenario or run limit hit, 2 usage error,");
    eprintln!("            3 model network defect (invariant, ordering or wiring error).");
}
