/// Pass-through relay across hierarchy boundaries.
pub mod bridge;
/// Simulated-time cursor owned by the scheduler.
pub mod clock;
/// Timestamped, prioritized events.
pub mod event;
pub mod kpi;
/// Household meter for net-power aggregation and limit tracking.
pub mod meter;
/// Atomic models and the stepping protocol.
pub mod model;
pub mod scheduler;
/// Timed external command scripts.
pub mod script;
pub mod time;
/// Device-family transition tables.
pub mod transition;
