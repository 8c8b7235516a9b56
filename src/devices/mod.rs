//! Household appliance families and their continuous-side collaborators.

/// Energy integration driven by recompute notices.
pub mod consumption;
/// Two-speed hair dryer.
pub mod hair_dryer;
/// Space heater with adjustable heating power.
pub mod heater;
/// Seeded random usage sessions.
pub mod usage;
pub mod washing_machine;
/// Residential wind turbine (production unit).
pub mod wind_turbine;

// Re-export the main types for convenience
pub use consumption::{ConsumptionModel, PowerRating, PowerSegment};
pub use hair_dryer::HairDryer;
pub use heater::Heater;
pub use usage::{UsagePattern, UsageProfile, generate_sessions};
pub use washing_machine::WashingMachine;
pub use wind_turbine::WindTurbine;
