//! Shared helpers for the synthetic energy profiles.

use rand::{Rng, rngs::StdRng};

/// A seeded source of per-step energy for one metering point.
pub trait EnergyProfile {
    /// Returns the energy in kWh for metering interval `step`.
    ///
    /// Values are never negative. Successive calls advance the noise stream,
    /// so steps must be requested in order for reproducible output.
    fn energy_kwh(&mut self, step: usize) -> f64;
}

/// Gaussian noise via the Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// A sample from `N(0, std_dev²)`; `0.0` when `std_dev` is not positive.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-sine daylight shape between sunrise (inclusive) and sunset (exclusive).
///
/// Returns a value in `[0, 1]`: zero outside daylight, one at solar noon.
pub fn daylight_frac(
    step: usize,
    steps_per_day: usize,
    sunrise_idx: usize,
    sunset_idx: usize,
) -> f64 {
    let t = step % steps_per_day.max(1);
    if t < sunrise_idx || t >= sunset_idx {
        return 0.0;
    }
    let span = (sunset_idx - sunrise_idx) as f64;
    let x = (t - sunrise_idx) as f64 / span;
    (std::f64::consts::PI * x).sin().max(0.0)
}
