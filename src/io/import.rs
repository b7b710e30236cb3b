//! CSV import of per-interval input samples.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, SimError};
use crate::sim::calendar::{INTERVAL_MINUTES, ReferenceYear};
use crate::sim::types::{Diversion, IntervalSample};

/// Column header of the input CSV. The two diversion columns are optional.
pub const HEADER: &str = "day_of_year,minute_of_day,load_kwh,pv_kwh,ev_kwh,hot_water_kwh";

#[derive(Debug, Deserialize)]
struct Row {
    day_of_year: u16,
    minute_of_day: u16,
    load_kwh: f64,
    pv_kwh: f64,
    #[serde(default)]
    ev_kwh: f64,
    #[serde(default)]
    hot_water_kwh: f64,
}

/// Splits each reading of `source_minutes` evenly into native intervals.
///
/// `source_minutes` must be a positive multiple of the interval length.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::io::import::resample_even;
///
/// let half_hourly = [0.6, 1.2];
/// let fine = resample_even(&half_hourly, 30);
/// assert_eq!(fine.len(), 12);
/// assert!((fine[0] - 0.1).abs() < 1e-12);
/// assert!((fine[6] - 0.2).abs() < 1e-12);
/// ```
pub fn resample_even(values: &[f64], source_minutes: u16) -> Vec<f64> {
    debug_assert!(source_minutes > 0 && source_minutes % INTERVAL_MINUTES == 0);
    let factor = usize::from((source_minutes / INTERVAL_MINUTES).max(1));
    values
        .iter()
        .flat_map(|&v| std::iter::repeat_n(v / factor as f64, factor))
        .collect()
}

/// Checks that `source_minutes` is a usable reading length.
pub fn validate_source_minutes(source_minutes: u16, field: &str) -> Vec<ConfigError> {
    if source_minutes == 0 || source_minutes % INTERVAL_MINUTES != 0 || 1440 % source_minutes != 0 {
        vec![ConfigError::new(
            field,
            format!("must be a multiple of {INTERVAL_MINUTES} that divides a day"),
        )]
    } else {
        Vec::new()
    }
}

/// Reads readings of `source_minutes` each and returns native-interval samples.
///
/// Row `k` (0-based, header excluded) must carry the calendar tags of the
/// `k`-th reading of the reference year. Readings are split evenly.
///
/// # Errors
///
/// * [`SimError::Csv`] on malformed CSV
/// * [`SimError::Misaligned`] when a row's tags do not match the calendar
/// * [`SimError::InvalidSample`] for a negative or non-finite energy
pub fn read_samples<R: Read>(reader: R, source_minutes: u16) -> Result<Vec<IntervalSample>, SimError> {
    SimError::check(validate_source_minutes(source_minutes, "source_minutes"))?;
    let factor = usize::from(source_minutes / INTERVAL_MINUTES);
    let year = ReferenceYear::new();

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut load = Vec::new();
    let mut pv = Vec::new();
    let mut ev = Vec::new();
    let mut hot_water = Vec::new();

    for (row, record) in rdr.deserialize::<Row>().enumerate() {
        let r = record?;
        let expected = year.slot(row * factor);
        if r.day_of_year != expected.day_of_year || r.minute_of_day != expected.minute_of_day {
            return Err(SimError::Misaligned {
                row,
                expected_day: expected.day_of_year,
                expected_minute: expected.minute_of_day,
                day: r.day_of_year,
                minute: r.minute_of_day,
            });
        }
        for (name, value) in [
            ("load_kwh", r.load_kwh),
            ("pv_kwh", r.pv_kwh),
            ("ev_kwh", r.ev_kwh),
            ("hot_water_kwh", r.hot_water_kwh),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidSample {
                    row,
                    message: format!("{name} = {value} must be a finite value >= 0"),
                });
            }
        }
        load.push(r.load_kwh);
        pv.push(r.pv_kwh);
        ev.push(r.ev_kwh);
        hot_water.push(r.hot_water_kwh);
    }

    let load = resample_even(&load, source_minutes);
    let pv = resample_even(&pv, source_minutes);
    let ev = resample_even(&ev, source_minutes);
    let hot_water = resample_even(&hot_water, source_minutes);

    let samples: Vec<IntervalSample> = (0..load.len())
        .map(|i| IntervalSample {
            slot: year.slot(i),
            load_kwh: load[i],
            pv_kwh: pv[i],
            diversion: Diversion {
                ev_kwh: ev[i],
                hot_water_kwh: hot_water[i],
            },
        })
        .collect();
    debug!(samples = samples.len(), source_minutes, "imported input samples");
    Ok(samples)
}

/// Reads samples from the CSV file at `path`.
///
/// # Errors
///
/// Returns [`SimError::Io`] when the file cannot be opened, otherwise as
/// [`read_samples`].
pub fn load_samples(path: &Path, source_minutes: u16) -> Result<Vec<IntervalSample>, SimError> {
    let file = File::open(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_samples(file, source_minutes)
}
