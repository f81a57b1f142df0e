use rand::{SeedableRng, rngs::StdRng};

use super::types::{EnergyProfile, daylight_frac, gaussian_noise};

/// A PV generation profile following a half-sine daylight curve.
///
/// Output is zero outside `[sunrise_idx, sunset_idx)` and peaks at solar noon.
/// Noise is multiplicative, so a cloudy interval scales the clear-sky output.
#[derive(Debug, Clone)]
pub struct PvProfile {
    /// Peak output in kilowatts under clear sky.
    pub kw_peak: f64,

    steps_per_day: usize,

    /// Metering interval of sunrise (inclusive).
    pub sunrise_idx: usize,

    /// Metering interval of sunset (exclusive).
    pub sunset_idx: usize,

    /// Standard deviation of the noise as a fraction of output.
    pub noise_std: f64,

    rng: StdRng,
}

impl PvProfile {
    /// Creates a PV profile.
    ///
    /// A window that does not fit inside the day yields a profile that never
    /// generates; configuration validation reports such windows up front.
    ///
    /// # Arguments
    ///
    /// * `kw_peak` - Peak output in kilowatts
    /// * `sunrise_idx` - Interval when generation starts
    /// * `sunset_idx` - Interval when generation stops
    /// * `noise_std` - Relative noise (e.g. 0.05 for about 5% variation)
    /// * `steps_per_day` - Metering intervals per day
    /// * `seed` - Random seed for reproducible noise
    pub fn new(
        kw_peak: f64,
        sunrise_idx: usize,
        sunset_idx: usize,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            kw_peak: kw_peak.max(0.0),
            steps_per_day: steps_per_day.max(1),
            sunrise_idx,
            sunset_idx,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn daylight_frac(&self, step: usize) -> f64 {
        daylight_frac(step, self.steps_per_day, self.sunrise_idx, self.sunset_idx)
    }

    /// Instantaneous output in kilowatts at `step`.
    pub fn output_kw(&mut self, step: usize) -> f64 {
        let frac = self.daylight_frac(step);
        if frac <= 0.0 {
            return 0.0;
        }
        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.kw_peak * frac * noise_mult).max(0.0)
    }
}

impl EnergyProfile for PvProfile {
    fn energy_kwh(&mut self, step: usize) -> f64 {
        let dt_hours = 24.0 / self.steps_per_day as f64;
        self.output_kw(step) * dt_hours
    }
}
