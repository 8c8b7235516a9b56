//! CSV export for event traces and meter readings.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::event::Payload;
use crate::sim::meter::MeterReading;
use crate::sim::model::ModelRole;
use crate::sim::scheduler::TraceEntry;

/// Column header for trace export.
const TRACE_HEADER: &str = "time_s,model,hierarchy,role,kind,state,payload";

/// Column header for meter export.
const METER_HEADER: &str = "time_s,net_kw,active_appliances,limit_ok";

/// Exports an event trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace_csv(trace: &[TraceEntry], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trace_csv(trace, io::BufWriter::new(file))
}

/// Writes an event trace as CSV to any writer.
///
/// One row per produced event, in trace order. Produces deterministic output
/// for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(trace: &[TraceEntry], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER.split(','))?;

    for e in trace {
        let role = match e.role {
            ModelRole::Device => "device",
            ModelRole::Bridge => "bridge",
        };
        wtr.write_record(&[
            format!("{:.3}", e.at.as_secs_f64()),
            e.model.clone(),
            e.hierarchy.clone(),
            role.to_string(),
            e.kind.to_string(),
            e.state.to_string(),
            payload_field(&e.payload),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports meter readings to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_meter_csv(readings: &[MeterReading], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_meter_csv(readings, io::BufWriter::new(file))
}

/// Writes meter readings as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_meter_csv(readings: &[MeterReading], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(METER_HEADER.split(','))?;

    for r in readings {
        wtr.write_record(&[
            format!("{:.3}", r.at.as_secs_f64()),
            format!("{:.4}", r.net_watts / 1000.0),
            r.active_appliances.to_string(),
            r.within_limits.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn payload_field(payload: &Payload) -> String {
    match payload {
        Payload::Empty => String::new(),
        Payload::Power { watts } => format!("power={watts}W"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::time::SimTime;

    fn entry(secs: u64, payload: Payload) -> TraceEntry {
        TraceEntry {
            at: SimTime::from_secs(secs),
            model: "heater".to_string(),
            hierarchy: "heater".to_string(),
            role: ModelRole::Device,
            kind: "set_power",
            state: "heating",
            payload,
        }
    }

    fn reading(secs: u64) -> MeterReading {
        MeterReading {
            at: SimTime::from_secs(secs),
            net_watts: 1250.0,
            active_appliances: 1,
            within_limits: true,
        }
    }

    #[test]
    fn trace_header_and_rows() {
        let trace = vec![
            entry(0, Payload::Empty),
            entry(5, Payload::Power { watts: 1200.0 }),
        ];
        let mut buf = Vec::new();
        write_trace_csv(&trace, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], TRACE_HEADER);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "5.000,heater,heater,device,set_power,heating,power=1200W");
    }

    #[test]
    fn meter_rows_parse_back() {
        let readings: Vec<MeterReading> = (0..4).map(|i| reading(i * 60)).collect();
        let mut buf = Vec::new();
        write_meter_csv(&readings, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).ok(), Some(4));
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            assert_eq!(rec[1].parse::<f64>().ok(), Some(1.25));
            assert_eq!(rec[3].parse::<bool>().ok(), Some(true));
            rows += 1;
        }
        assert_eq!(rows, 4);
    }

    #[test]
    fn deterministic_output() {
        let trace: Vec<TraceEntry> = (0..5).map(|i| entry(i, Payload::Empty)).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_trace_csv(&trace, &mut buf1).unwrap();
        write_trace_csv(&trace, &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }
}
