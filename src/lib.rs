//! Household PV + battery + grid simulator on a 5-minute reference year.

pub mod config;
pub mod devices;
pub mod error;
/// CSV import, synthetic profiles and CSV export.
pub mod io;
pub mod runner;
/// Calendar, schedules, per-inverter decisions and the step engine.
pub mod sim;
