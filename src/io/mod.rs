/// CSV export of traces and meter readings.
pub mod export;
