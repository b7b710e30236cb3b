//! Common types and traits for synthetic input profiles.

use rand::{Rng, rngs::StdRng};

use crate::sim::calendar::IntervalSlot;

/// A generator of per-interval energy for one input series (load or PV).
///
/// Implementations may be stateful (seeded noise), so intervals should be
/// requested in ascending order for reproducible output.
pub trait Profile {
    /// Returns the energy in kWh for the interval described by `slot`.
    ///
    /// Values are never negative.
    fn energy_kwh(&mut self, slot: &IntervalSlot) -> f64;

    /// Returns a human-readable type name for the profile.
    fn profile_type(&self) -> &'static str;
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
