use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use super::types::{Profile, gaussian_noise};
use crate::sim::calendar::{INTERVAL_HOURS, IntervalSlot};

/// Parameters of a synthetic household base load.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseLoadParams {
    /// Average consumption (kW).
    pub base_kw: f64,
    /// Amplitude of the daily sinusoid (kW).
    pub amp_kw: f64,
    /// Phase offset of the daily sinusoid (radians).
    pub phase_rad: f64,
    /// Standard deviation of the Gaussian noise (kW).
    pub noise_std: f64,
    /// Extra consumption in the coldest part of the year, as a fraction of `base_kw`.
    pub winter_uplift: f64,
}

/// A baseload generator that models daily electricity consumption patterns.
///
/// `BaseLoad` creates a sinusoidal power demand pattern with configurable baseline,
/// amplitude, phase, and random noise, plus a seasonal uplift peaking in
/// mid-winter. Output is energy per interval.
///
/// # Examples
///
/// ```
/// use pv_battery_sim::devices::baseload::{BaseLoad, BaseLoadParams};
/// use pv_battery_sim::devices::Profile;
/// use pv_battery_sim::sim::calendar::ReferenceYear;
///
/// let params = BaseLoadParams {
///     base_kw: 0.6,
///     amp_kw: 0.3,
///     phase_rad: 0.0,
///     noise_std: 0.0,
///     winter_uplift: 0.0,
/// };
/// let mut load = BaseLoad::new(params, 42);
/// let noon = ReferenceYear::new().slot(144);
/// assert!(load.energy_kwh(&noon) >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    pub params: BaseLoadParams,

    /// Random number generator for noise generation
    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new baseload generator seeded with `seed`.
    pub fn new(params: BaseLoadParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Calculates the power demand at `slot`.
    ///
    /// The demand is guaranteed to be non-negative.
    pub fn demand_kw(&mut self, slot: &IntervalSlot) -> f64 {
        let p = &self.params;
        let day_pos = f64::from(slot.minute_of_day) / 1440.0; // [0,1)
        let angle = 2.0 * std::f64::consts::PI * day_pos + p.phase_rad;
        let uplift = p.base_kw * p.winter_uplift * winter_weight(slot.day_of_year);
        let noise = gaussian_noise(&mut self.rng, p.noise_std);

        let kw = p.base_kw + uplift + p.amp_kw * angle.sin() + noise;
        kw.max(0.0) // no negative demand
    }
}

impl Profile for BaseLoad {
    fn energy_kwh(&mut self, slot: &IntervalSlot) -> f64 {
        self.demand_kw(slot) * INTERVAL_HOURS
    }

    fn profile_type(&self) -> &'static str {
        "BaseLoad"
    }
}

/// `1.0` at the winter solstice, `0.0` at the summer solstice.
pub(crate) fn winter_weight(day_of_year: u16) -> f64 {
    1.0 - summer_weight(day_of_year)
}

/// `1.0` at the summer solstice (day 172), `0.0` at the winter solstice.
pub(crate) fn summer_weight(day_of_year: u16) -> f64 {
    let angle = 2.0 * std::f64::consts::PI * (f64::from(day_of_year) - 172.0) / 365.0;
    0.5 * (1.0 + angle.cos())
}
