use rand::{SeedableRng, rngs::StdRng};
use serde::Deserialize;

use super::baseload::summer_weight;
use super::types::{Profile, gaussian_noise};
use crate::sim::calendar::{INTERVAL_HOURS, IntervalSlot};

/// Parameters of a synthetic rooftop PV array.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolarParams {
    /// Peak output on a clear midsummer noon (kW).
    pub kw_peak: f64,
    /// Midwinter peak as a fraction of `kw_peak`.
    pub winter_peak_fraction: f64,
    /// Hours between sunrise and sunset at the summer solstice.
    pub summer_daylight_hours: f64,
    /// Hours between sunrise and sunset at the winter solstice.
    pub winter_daylight_hours: f64,
    /// Standard deviation of the multiplicative noise (fraction of output).
    pub noise_std: f64,
}

/// A solar PV generator with a seasonal daylight window.
///
/// `SolarPv` creates a half-sine shaped generation profile centred on noon.
/// Both the day length and the peak output follow a half-cosine across the
/// year, from the winter values at day 355 to the summer values at day 172.
/// Random noise simulates passing clouds.
#[derive(Debug, Clone)]
pub struct SolarPv {
    pub params: SolarParams,

    /// Random number generator for noise generation.
    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar PV generator.
    ///
    /// # Arguments
    ///
    /// * `params` - Array parameters
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(params: SolarParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Daylight hours and peak power (kW) on `day_of_year`.
    fn season(&self, day_of_year: u16) -> (f64, f64) {
        let p = &self.params;
        let summer = summer_weight(day_of_year);
        let daylight = p.winter_daylight_hours
            + (p.summer_daylight_hours - p.winter_daylight_hours) * summer;
        let peak_fraction = p.winter_peak_fraction + (1.0 - p.winter_peak_fraction) * summer;
        (daylight, p.kw_peak * peak_fraction)
    }

    /// Calculates the daylight fraction at `slot`, in `[0, 1]`.
    ///
    /// Uses the interval midpoint so a symmetric window yields symmetric output.
    pub fn daylight_frac(&self, slot: &IntervalSlot) -> f64 {
        let (daylight, _) = self.season(slot.day_of_year);
        if daylight <= 0.0 {
            return 0.0;
        }
        let hour = (f64::from(slot.minute_of_day) + 2.5) / 60.0;
        let sunrise = 12.0 - daylight / 2.0;
        let x = (hour - sunrise) / daylight;
        if (0.0..=1.0).contains(&x) {
            (std::f64::consts::PI * x).sin()
        } else {
            0.0
        }
    }

    /// Calculates the generated power (kW) at `slot`. Never negative.
    pub fn power_kw(&mut self, slot: &IntervalSlot) -> f64 {
        let frac = self.daylight_frac(slot);
        if frac <= 0.0 {
            return 0.0; // night
        }
        let (_, peak) = self.season(slot.day_of_year);
        let noise = 1.0 + gaussian_noise(&mut self.rng, self.params.noise_std);
        (peak * frac * noise).max(0.0)
    }
}

impl Profile for SolarPv {
    fn energy_kwh(&mut self, slot: &IntervalSlot) -> f64 {
        self.power_kw(slot) * INTERVAL_HOURS
    }

    fn profile_type(&self) -> &'static str {
        "SolarPV"
    }
}
