//! Core simulation types: input samples, per-inverter results and output records.

use std::fmt;
use std::ops::AddAssign;

use super::calendar::IntervalSlot;

/// Energy diverted to auxiliary consumers (EV charger, hot-water heater).
///
/// Passed through unchanged from input to output; the step function does not
/// compute or consume these values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Diversion {
    pub ev_kwh: f64,
    pub hot_water_kwh: f64,
}

impl AddAssign for Diversion {
    fn add_assign(&mut self, rhs: Self) {
        self.ev_kwh += rhs.ev_kwh;
        self.hot_water_kwh += rhs.hot_water_kwh;
    }
}

/// One inverter's input for one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSample {
    pub slot: IntervalSlot,
    /// Energy consumed (kWh).
    pub load_kwh: f64,
    /// Raw PV energy before inverter losses (kWh).
    pub pv_kwh: f64,
    pub diversion: Diversion,
}

/// Energy flows of one inverter for one interval, all in kWh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InverterStep {
    pub load_kwh: f64,
    /// Raw PV.
    pub pv_kwh: f64,
    /// Grid import, including grid-to-battery charging.
    pub buy_kwh: f64,
    /// Grid export, including forced discharge.
    pub feed_kwh: f64,
    /// Energy withdrawn from the battery to cover load (before storage loss).
    pub battery_to_load_kwh: f64,
    /// PV excess routed into the battery (before DC-DC loss).
    pub pv_to_charge_kwh: f64,
    /// Grid energy drawn for scheduled charging (before AC-DC loss).
    pub grid_to_battery_kwh: f64,
    /// Energy delivered to the grid by forced discharge.
    pub battery_to_grid_kwh: f64,
    /// Usable PV excess neither stored nor exported.
    pub curtailed_kwh: f64,
    /// Battery SOC at the end of the interval.
    pub soc_kwh: f64,
    pub diversion: Diversion,
}

impl AddAssign<&InverterStep> for InverterStep {
    fn add_assign(&mut self, rhs: &InverterStep) {
        self.load_kwh += rhs.load_kwh;
        self.pv_kwh += rhs.pv_kwh;
        self.buy_kwh += rhs.buy_kwh;
        self.feed_kwh += rhs.feed_kwh;
        self.battery_to_load_kwh += rhs.battery_to_load_kwh;
        self.pv_to_charge_kwh += rhs.pv_to_charge_kwh;
        self.grid_to_battery_kwh += rhs.grid_to_battery_kwh;
        self.battery_to_grid_kwh += rhs.battery_to_grid_kwh;
        self.curtailed_kwh += rhs.curtailed_kwh;
        self.soc_kwh += rhs.soc_kwh;
        self.diversion += rhs.diversion;
    }
}

/// Complete record of one simulation interval, summed across all inverters.
///
/// Battery SOCs are summed for reporting only; batteries are never pooled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRecord {
    pub slot: IntervalSlot,
    pub totals: InverterStep,
}

impl OutputRecord {
    /// Sums `steps` into one record for `slot`.
    pub fn aggregate<'a>(slot: IntervalSlot, steps: impl IntoIterator<Item = &'a InverterStep>) -> Self {
        let mut totals = InverterStep::default();
        for step in steps {
            totals += step;
        }
        Self { slot, totals }
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.totals;
        write!(
            f,
            "#{:>6} d{:>3} {} | load={:.3}  pv={:.3} | buy={:.3}  feed={:.3} | \
             bat->load={:.3}  pv->bat={:.3}  grid->bat={:.3}  bat->grid={:.3} | soc={:.3} kWh",
            self.slot.index,
            self.slot.day_of_year,
            self.slot.time_label(),
            t.load_kwh,
            t.pv_kwh,
            t.buy_kwh,
            t.feed_kwh,
            t.battery_to_load_kwh,
            t.pv_to_charge_kwh,
            t.grid_to_battery_kwh,
            t.battery_to_grid_kwh,
            t.soc_kwh,
        )
    }
}
