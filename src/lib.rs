//! Discrete-event household appliance simulator.
//!
//! Atomic models hold each appliance's discrete state and apply prioritized,
//! timestamped events; bridges relay those events to the household meter,
//! where recompute notices drive energy integration.

/// Command-line parsing for the binary.
pub mod cli;
pub mod config;
/// Appliance families, consumption models, and usage sessions.
pub mod devices;
pub mod error;
pub mod io;
pub mod logging;
/// Household run orchestration.
pub mod runner;
/// Discrete-event core: time, events, models, bridges, scheduler, metering.
pub mod sim;
