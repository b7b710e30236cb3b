//! Post-hoc summary computation from simulation records.

use std::fmt;

use super::types::{InverterStep, OutputRecord};

/// Aggregate energy totals and ratios derived from a complete simulation run.
///
/// Computed post-hoc from `&[OutputRecord]` so reported figures always match
/// the interval data.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Number of intervals summarised.
    pub intervals: usize,
    /// Sum of every flow across all intervals (SOC is the final value).
    pub totals: InverterStep,
    /// Share of PV not exported to the grid, in percent.
    pub self_consumption_pct: f64,
    /// Share of load not covered by grid import, in percent.
    pub self_sufficiency_pct: f64,
    /// Largest grid import in a single interval (kWh).
    pub peak_buy_kwh: f64,
    /// Battery equivalent full cycles (throughput / 2*capacity).
    pub battery_equivalent_full_cycles: f64,
}

impl Summary {
    /// Computes all figures from the complete record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Complete simulation output
    /// * `battery_capacity_kwh` - Total battery capacity for cycle calculation
    pub fn from_records(records: &[OutputRecord], battery_capacity_kwh: f64) -> Self {
        let mut totals = InverterStep::default();
        let mut peak_buy = 0.0_f64;
        for r in records {
            totals += &r.totals;
            peak_buy = peak_buy.max(r.totals.buy_kwh);
        }
        totals.soc_kwh = records.last().map_or(0.0, |r| r.totals.soc_kwh);

        let pv_exported = totals.feed_kwh - totals.battery_to_grid_kwh;
        let self_consumption_pct = if totals.pv_kwh > 0.0 {
            (100.0 * (1.0 - pv_exported / totals.pv_kwh)).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let grid_to_load = totals.buy_kwh - totals.grid_to_battery_kwh;
        let self_sufficiency_pct = if totals.load_kwh > 0.0 {
            (100.0 * (1.0 - grid_to_load / totals.load_kwh)).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let throughput = totals.pv_to_charge_kwh
            + totals.grid_to_battery_kwh
            + totals.battery_to_load_kwh
            + totals.battery_to_grid_kwh;
        let cycles = if battery_capacity_kwh > 0.0 {
            throughput / (2.0 * battery_capacity_kwh)
        } else {
            0.0
        };

        Self {
            intervals: records.len(),
            totals,
            self_consumption_pct,
            self_sufficiency_pct,
            peak_buy_kwh: peak_buy,
            battery_equivalent_full_cycles: cycles,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.totals;
        writeln!(f, "--- Summary ({} intervals) ---", self.intervals)?;
        writeln!(f, "Load:                  {:.2} kWh", t.load_kwh)?;
        writeln!(f, "PV:                    {:.2} kWh", t.pv_kwh)?;
        writeln!(f, "Grid import:           {:.2} kWh", t.buy_kwh)?;
        writeln!(f, "  of which to battery: {:.2} kWh", t.grid_to_battery_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", t.feed_kwh)?;
        writeln!(f, "  of which battery:    {:.2} kWh", t.battery_to_grid_kwh)?;
        writeln!(f, "Battery to load:       {:.2} kWh", t.battery_to_load_kwh)?;
        writeln!(f, "PV to battery:         {:.2} kWh", t.pv_to_charge_kwh)?;
        writeln!(f, "Curtailed:             {:.2} kWh", t.curtailed_kwh)?;
        writeln!(f, "Peak import:           {:.3} kWh/interval", self.peak_buy_kwh)?;
        writeln!(f, "Self-consumption:      {:.1}%", self.self_consumption_pct)?;
        writeln!(f, "Self-sufficiency:      {:.1}%", self.self_sufficiency_pct)?;
        writeln!(
            f,
            "Battery:               {:.2} kWh final SOC ({:.2} equiv. cycles)",
            t.soc_kwh, self.battery_equivalent_full_cycles
        )
    }
}
