use rand::{SeedableRng, rngs::StdRng};

use super::types::{EnergyProfile, gaussian_noise};

/// A household consumption profile with a daily sinusoidal pattern.
///
/// Demand is `base_kw + amp_kw·sin(2π·day_pos + phase_rad) + noise`, clamped at
/// zero and integrated over the metering interval.
///
/// # Examples
///
/// ```
/// use ec_value_share::profiles::{ConsumptionProfile, EnergyProfile};
///
/// let mut load = ConsumptionProfile::new(
///     1.0,  // base_kw - average demand
///     0.5,  // amp_kw - daily variation
///     0.0,  // phase_rad
///     0.05, // noise_std
///     24,   // steps_per_day - hourly metering
///     42,   // seed
/// );
/// assert!(load.energy_kwh(12) >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ConsumptionProfile {
    /// Baseline demand in kilowatts.
    pub base_kw: f64,

    /// Amplitude of the sinusoidal variation in kilowatts.
    pub amp_kw: f64,

    /// Phase offset of the sinusoidal pattern in radians.
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise in kilowatts.
    pub noise_std: f64,

    /// Number of metering intervals per day.
    pub steps_per_day: usize,

    rng: StdRng,
}

impl ConsumptionProfile {
    /// Creates a consumption profile.
    ///
    /// # Arguments
    ///
    /// * `base_kw` - Baseline demand in kilowatts
    /// * `amp_kw` - Amplitude of the daily variation in kilowatts
    /// * `phase_rad` - Phase offset in radians
    /// * `noise_std` - Standard deviation of Gaussian noise in kilowatts
    /// * `steps_per_day` - Metering intervals per day
    /// * `seed` - Random seed for reproducible noise
    pub fn new(
        base_kw: f64,
        amp_kw: f64,
        phase_rad: f64,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            base_kw,
            amp_kw,
            phase_rad,
            noise_std: noise_std.max(0.0),
            steps_per_day: steps_per_day.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Instantaneous demand in kilowatts at `step`.
    pub fn demand_kw(&mut self, step: usize) -> f64 {
        let day_pos = (step % self.steps_per_day) as f64 / self.steps_per_day as f64;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);
        (self.base_kw + self.amp_kw * angle.sin() + noise).max(0.0)
    }
}

impl EnergyProfile for ConsumptionProfile {
    fn energy_kwh(&mut self, step: usize) -> f64 {
        let dt_hours = 24.0 / self.steps_per_day as f64;
        self.demand_kw(step) * dt_hours
    }
}
