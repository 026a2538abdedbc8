//! CSV export for device reading histories.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::SecondsFormat;

use crate::devices::Reading;

const HEADER: [&str; 6] = [
    "timestamp",
    "device_id",
    "consumption_w",
    "voltage_v",
    "current_a",
    "power_factor",
];

/// Writes `readings` to a CSV file at `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(readings: &[Reading], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(readings, io::BufWriter::new(file))
}

/// Writes a header row and one row per reading, in the order given.
///
/// Timestamps are RFC 3339 with millisecond precision.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(readings: &[Reading], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER)?;

    for r in readings {
        wtr.write_record(&[
            r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            r.device_id.clone(),
            format!("{:.2}", r.consumption),
            format!("{:.2}", r.voltage),
            format!("{:.4}", r.current),
            format!("{:.3}", r.power_factor),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Renders `readings` as an in-memory CSV document.
///
/// # Errors
///
/// Returns an `io::Error` if the CSV writer fails.
pub fn to_csv_string(readings: &[Reading]) -> io::Result<String> {
    let mut buf = Vec::new();
    write_csv(readings, &mut buf)?;
    String::from_utf8(buf).map_err(io::Error::other)
}
