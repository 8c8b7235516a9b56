//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::devices::hair_dryer::{HairDryer, HairDryerEvent};
use crate::devices::heater::{Heater, HeaterEvent};
use crate::devices::usage::UsageProfile;
use crate::devices::washing_machine::{WashingMachine, WashingMachineEvent};
use crate::devices::wind_turbine::{WindTurbine, WindTurbineEvent};
use crate::sim::event::EventKind;
use crate::sim::model::IntakePolicy;
use crate::sim::scheduler::RunLimits;
use crate::sim::time::SimTime;
use crate::sim::transition::DeviceFamily;

/// Family names accepted in `[[appliance]]` tables.
pub const FAMILIES: &[&str] = &[
    Heater::NAME,
    HairDryer::NAME,
    WashingMachine::NAME,
    WindTurbine::NAME,
];

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`] for
/// the built-in default household.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulated window and run-level parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Household meter limits.
    #[serde(default)]
    pub meter: MeterConfig,
    /// Appliances in the household, one `[[appliance]]` table each.
    #[serde(default, rename = "appliance")]
    pub appliances: Vec<ApplianceConfig>,
}

/// Simulated window and run-level parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Start of the simulated window (seconds since midnight).
    pub start_secs: u64,
    /// End of the simulated window (seconds since midnight, > start).
    pub end_secs: u64,
    /// Master random seed for usage sessions.
    pub seed: u64,
    /// Multi-event intake handling: `"priority"` or `"strict"`.
    pub intake_policy: String,
    /// Optional cap on model steps per appliance run.
    pub max_steps: Option<u64>,
    /// Optional wall-clock budget per appliance run (milliseconds).
    pub wall_deadline_ms: Option<u64>,
    /// Optional pacing: simulated seconds per wall-clock second.
    pub acceleration: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_secs: 0,
            end_secs: 86_400,
            seed: 42,
            intake_policy: "priority".to_string(),
            max_steps: None,
            wall_deadline_ms: None,
            acceleration: None,
        }
    }
}

/// Household meter import/export limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    /// Maximum import power (kW).
    pub max_import_kw: f64,
    /// Maximum export power (kW, positive magnitude).
    pub max_export_kw: f64,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            max_import_kw: 5.0,
            max_export_kw: 3.0,
        }
    }
}

/// One appliance in the household.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    /// Unique appliance name; also the name of its hierarchy.
    pub name: String,
    /// One of [`FAMILIES`].
    pub family: String,
    /// Scripted commands.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
    /// Seeded random usage sessions, merged with the scripted commands.
    #[serde(default)]
    pub usage: Option<UsageConfig>,
}

/// A scripted command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Time of the command (seconds since midnight).
    pub at_secs: f64,
    /// Event kind name, e.g. `"switch_on"`.
    pub kind: String,
    /// Optional power request carried as the event payload.
    #[serde(default)]
    pub watts: Option<f64>,
}

/// Random usage-session parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsageConfig {
    /// Number of sessions to sample.
    pub sessions: usize,
    /// Minimum gap between commands (seconds).
    pub min_gap_secs: u64,
    /// Maximum gap between commands (seconds).
    pub max_gap_secs: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            sessions: 1,
            min_gap_secs: 300,
            max_gap_secs: 1800,
        }
    }
}

impl From<&UsageConfig> for UsageProfile {
    fn from(u: &UsageConfig) -> Self {
        UsageProfile {
            sessions: u.sessions,
            min_gap_secs: u.min_gap_secs,
            max_gap_secs: u.max_gap_secs,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.end_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl SimulationConfig {
    /// Simulated window as `(start, end)`.
    pub fn window(&self) -> (SimTime, SimTime) {
        (
            SimTime::from_secs(self.start_secs),
            SimTime::from_secs(self.end_secs),
        )
    }

    /// Parsed intake policy.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for anything but `"priority"` or `"strict"`.
    pub fn intake_policy(&self) -> Result<IntakePolicy, ConfigError> {
        match self.intake_policy.as_str() {
            "priority" => Ok(IntakePolicy::PriorityOrdered),
            "strict" => Ok(IntakePolicy::Strict),
            other => Err(ConfigError {
                field: "simulation.intake_policy".into(),
                message: format!("must be \"priority\" or \"strict\", got \"{other}\""),
            }),
        }
    }

    /// Scheduler limits derived from this section.
    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            max_steps: self.max_steps,
            wall_deadline: self.wall_deadline_ms.map(Duration::from_millis),
            acceleration: self.acceleration,
        }
    }
}

/// Returns whether `kind` names an event of `family`, or `None` for an
/// unknown family.
pub fn family_accepts(family: &str, kind: &str) -> Option<bool> {
    match family {
        Heater::NAME => Some(HeaterEvent::parse(kind).is_some()),
        HairDryer::NAME => Some(HairDryerEvent::parse(kind).is_some()),
        WashingMachine::NAME => Some(WashingMachineEvent::parse(kind).is_some()),
        WindTurbine::NAME => Some(WindTurbineEvent::parse(kind).is_some()),
        _ => None,
    }
}

fn command(at_secs: f64, kind: &str) -> CommandConfig {
    CommandConfig {
        at_secs,
        kind: kind.to_string(),
        watts: None,
    }
}

impl ScenarioConfig {
    /// Returns the baseline household: one simulated day, a scripted morning
    /// heating cycle and hair dryer use, a randomly timed wash, and a
    /// wind turbine.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            meter: MeterConfig::default(),
            appliances: vec![
                ApplianceConfig {
                    name: "heater".to_string(),
                    family: Heater::NAME.to_string(),
                    commands: vec![
                        command(21_600.0, "switch_on"),
                        command(21_900.0, "begin_heat"),
                        CommandConfig {
                            at_secs: 25_200.0,
                            kind: "set_power".to_string(),
                            watts: Some(1500.0),
                        },
                        command(28_800.0, "end_heat"),
                        command(30_600.0, "switch_off"),
                    ],
                    usage: None,
                },
                ApplianceConfig {
                    name: "hair_dryer".to_string(),
                    family: HairDryer::NAME.to_string(),
                    commands: vec![
                        command(26_100.0, "switch_on"),
                        command(26_160.0, "set_high"),
                        command(26_400.0, "set_low"),
                        command(26_520.0, "switch_off"),
                    ],
                    usage: None,
                },
                ApplianceConfig {
                    name: "washing_machine".to_string(),
                    family: WashingMachine::NAME.to_string(),
                    commands: Vec::new(),
                    usage: Some(UsageConfig {
                        sessions: 1,
                        min_gap_secs: 600,
                        max_gap_secs: 5400,
                    }),
                },
                ApplianceConfig {
                    name: "wind_turbine".to_string(),
                    family: WindTurbine::NAME.to_string(),
                    commands: Vec::new(),
                    usage: Some(UsageConfig {
                        sessions: 2,
                        min_gap_secs: 1800,
                        max_gap_secs: 14_400,
                    }),
                },
            ],
        }
    }

    /// Returns the busy-evening preset: six evening hours, tight meter
    /// limits, and co-timed commands across several appliances.
    pub fn busy_evening() -> Self {
        Self {
            simulation: SimulationConfig {
                start_secs: 61_200,
                end_secs: 82_800,
                ..SimulationConfig::default()
            },
            meter: MeterConfig {
                max_import_kw: 3.0,
                max_export_kw: 2.0,
            },
            appliances: vec![
                ApplianceConfig {
                    name: "heater".to_string(),
                    family: Heater::NAME.to_string(),
                    commands: vec![
                        command(64_800.0, "switch_on"),
                        // Co-timed: begin_heat applies before switch_off.
                        command(65_100.0, "switch_off"),
                        command(65_100.0, "begin_heat"),
                        command(66_000.0, "switch_on"),
                        command(66_000.0, "begin_heat"),
                        command(72_000.0, "end_heat"),
                        command(72_000.0, "switch_off"),
                    ],
                    usage: None,
                },
                ApplianceConfig {
                    name: "hair_dryer".to_string(),
                    family: HairDryer::NAME.to_string(),
                    commands: Vec::new(),
                    usage: Some(UsageConfig {
                        sessions: 2,
                        min_gap_secs: 60,
                        max_gap_secs: 900,
                    }),
                },
                ApplianceConfig {
                    name: "washing_machine".to_string(),
                    family: WashingMachine::NAME.to_string(),
                    commands: vec![
                        command(66_000.0, "switch_on"),
                        command(66_000.0, "start_use"),
                        command(69_600.0, "stop_use"),
                        command(69_660.0, "switch_off"),
                    ],
                    usage: None,
                },
                ApplianceConfig {
                    name: "wind_turbine".to_string(),
                    family: WindTurbine::NAME.to_string(),
                    commands: vec![command(61_200.0, "start_use")],
                    usage: None,
                },
            ],
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "busy_evening"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "busy_evening" => Ok(Self::busy_evening()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.end_secs <= s.start_secs {
            errors.push(ConfigError {
                field: "simulation.end_secs".into(),
                message: "must be > simulation.start_secs".into(),
            });
        }
        if let Err(e) = s.intake_policy() {
            errors.push(e);
        }
        if s.max_steps == Some(0) {
            errors.push(ConfigError {
                field: "simulation.max_steps".into(),
                message: "must be > 0 when set".into(),
            });
        }
        if let Some(acc) = s.acceleration {
            if !(acc.is_finite() && acc > 0.0) {
                errors.push(ConfigError {
                    field: "simulation.acceleration".into(),
                    message: "must be a positive finite number when set".into(),
                });
            } else {
                let window = s.end_secs.saturating_sub(s.start_secs) as f64;
                if Duration::try_from_secs_f64(window / acc).is_err() {
                    errors.push(ConfigError {
                        field: "simulation.acceleration".into(),
                        message: format!("{acc} is too small: the paced run would never finish"),
                    });
                }
            }
        }

        let m = &self.meter;
        if m.max_import_kw.is_nan() || m.max_import_kw < 0.0 {
            errors.push(ConfigError {
                field: "meter.max_import_kw".into(),
                message: "must be >= 0".into(),
            });
        }
        if m.max_export_kw.is_nan() || m.max_export_kw < 0.0 {
            errors.push(ConfigError {
                field: "meter.max_export_kw".into(),
                message: "must be >= 0".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, a) in self.appliances.iter().enumerate() {
            let prefix = format!("appliance[{i}]");
            if a.name.trim().is_empty() {
                errors.push(ConfigError {
                    field: format!("{prefix}.name"),
                    message: "must not be empty".into(),
                });
            } else if !seen.insert(a.name.as_str()) {
                errors.push(ConfigError {
                    field: format!("{prefix}.name"),
                    message: format!("duplicate appliance name \"{}\"", a.name),
                });
            }

            let known_family = FAMILIES.contains(&a.family.as_str());
            if !known_family {
                errors.push(ConfigError {
                    field: format!("{prefix}.family"),
                    message: format!(
                        "unknown family \"{}\", available: {}",
                        a.family,
                        FAMILIES.join(", ")
                    ),
                });
            }

            for (j, c) in a.commands.iter().enumerate() {
                let field = format!("{prefix}.commands[{j}]");
                if known_family && family_accepts(&a.family, &c.kind) == Some(false) {
                    errors.push(ConfigError {
                        field: format!("{field}.kind"),
                        message: format!("\"{}\" is not a {} event", c.kind, a.family),
                    });
                }
                let in_window = c.at_secs.is_finite()
                    && c.at_secs >= s.start_secs as f64
                    && c.at_secs <= s.end_secs as f64;
                if !in_window {
                    errors.push(ConfigError {
                        field: format!("{field}.at_secs"),
                        message: format!(
                            "{} is outside the simulated window [{}, {}]",
                            c.at_secs, s.start_secs, s.end_secs
                        ),
                    });
                }
                if let Some(w) = c.watts {
                    if !w.is_finite() {
                        errors.push(ConfigError {
                            field: format!("{field}.watts"),
                            message: "must be finite".into(),
                        });
                    }
                }
            }

            if let Some(u) = &a.usage {
                if let Err(e) = UsageProfile::from(u).validate() {
                    errors.push(ConfigError {
                        field: format!("{prefix}.usage"),
                        message: e.to_string(),
                    });
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
start_secs = 3600
end_secs = 7200
seed = 7
intake_policy = "strict"
max_steps = 500

[meter]
max_import_kw = 4.0
max_export_kw = 1.0

[[appliance]]
name = "living-room heater"
family = "heater"
commands = [
  { at_secs = 3600, kind = "switch_on" },
  { at_secs = 3700, kind = "begin_heat" },
  { at_secs = 4000, kind = "set_power", watts = 1200.0 },
]

[[appliance]]
name = "turbine"
family = "wind_turbine"

[appliance.usage]
sessions = 2
min_gap_secs = 60
max_gap_secs = 120
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.simulation.start_secs, 3600);
        assert_eq!(cfg.appliances.len(), 2);
        assert_eq!(cfg.appliances[0].commands[2].watts, Some(1200.0));
        assert_eq!(cfg.appliances[1].usage.as_ref().map(|u| u.sessions), Some(2));
        assert!(matches!(
            cfg.simulation.intake_policy(),
            Ok(IntakePolicy::Strict)
        ));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
end_secs = 100
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nseed = 99\n").unwrap();
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.simulation.end_secs, 86_400);
        assert_eq!(cfg.meter.max_import_kw, 5.0);
        assert!(cfg.appliances.is_empty());
    }

    #[test]
    fn validation_catches_empty_window() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.end_secs = cfg.simulation.start_secs;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.end_secs"));
    }

    #[test]
    fn validation_catches_bad_intake_policy() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.intake_policy = "fifo".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.intake_policy"));
    }

    #[test]
    fn validation_catches_unknown_family_and_kind() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.appliances[0].commands.push(command(30_000.0, "set_high"));
        cfg.appliances[1].family = "toaster".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "appliance[0].commands[5].kind"));
        assert!(errors.iter().any(|e| e.field == "appliance[1].family"));
    }

    #[test]
    fn validation_catches_command_outside_window() {
        let mut cfg = ScenarioConfig::busy_evening();
        cfg.appliances[0].commands[0].at_secs = 10.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "appliance[0].commands[0].at_secs"));
    }

    #[test]
    fn validation_catches_duplicate_names() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.appliances[1].name = "heater".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn validation_catches_unusable_acceleration() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.acceleration = Some(1e-300);
        let errors = cfg.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "simulation.acceleration" && e.message.contains("too small"))
        );

        cfg.simulation.acceleration = Some(0.0);
        assert!(!cfg.validate().is_empty());

        cfg.simulation.acceleration = Some(3600.0);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn busy_evening_has_tighter_limits() {
        let base = ScenarioConfig::baseline();
        let busy = ScenarioConfig::busy_evening();
        assert!(busy.meter.max_import_kw < base.meter.max_import_kw);
    }

    #[test]
    fn family_lookup() {
        assert_eq!(family_accepts("heater", "begin_heat"), Some(true));
        assert_eq!(family_accepts("heater", "set_high"), Some(false));
        assert_eq!(family_accepts("toaster", "switch_on"), None);
    }
}
