//! CSV export for simulation output records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::OutputRecord;

/// Column header of the output CSV.
const HEADER: &str = "interval,date,time,day_of_year,load_kwh,pv_kwh,buy_kwh,feed_kwh,\
                       battery_to_load_kwh,pv_to_charge_kwh,grid_to_battery_kwh,\
                       battery_to_grid_kwh,soc_kwh,ev_kwh,hot_water_kwh";

/// Exports output records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per interval. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[OutputRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes output records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[OutputRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        let t = &r.totals;
        wtr.write_record(&[
            r.slot.index.to_string(),
            r.slot.date.to_string(),
            r.slot.time_label(),
            r.slot.day_of_year.to_string(),
            format!("{:.6}", t.load_kwh),
            format!("{:.6}", t.pv_kwh),
            format!("{:.6}", t.buy_kwh),
            format!("{:.6}", t.feed_kwh),
            format!("{:.6}", t.battery_to_load_kwh),
            format!("{:.6}", t.pv_to_charge_kwh),
            format!("{:.6}", t.grid_to_battery_kwh),
            format!("{:.6}", t.battery_to_grid_kwh),
            format!("{:.6}", t.soc_kwh),
            format!("{:.6}", t.diversion.ev_kwh),
            format!("{:.6}", t.diversion.hot_water_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
