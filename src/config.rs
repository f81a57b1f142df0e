//! TOML-based run configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::community::{Tariff, UndefinedHandling};

/// Date format of `start_day`, `end_day` and `synthetic.start_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Top-level run configuration parsed from TOML.
///
/// Every section has defaults matching the baseline run. Load from TOML
/// with [`RunConfig::from_toml_file`] or use [`RunConfig::baseline`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Consumption and feed-in prices.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// CSV dataset location, column names and observation window.
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Handling of undefined values in window sums.
    #[serde(default)]
    pub summary: SummaryConfig,
    /// Synthetic community used when no dataset path is set.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    /// Optional CSV outputs.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Consumption and feed-in prices per kWh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Price per kWh drawn from the grid.
    pub consumption_price: f64,
    /// Price per kWh fed into the grid. Zero is the floor; negative prices
    /// fail validation.
    pub feed_in_price: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        let t = Tariff::default();
        Self {
            consumption_price: t.consumption_price,
            feed_in_price: t.feed_in_price,
        }
    }
}

impl TariffConfig {
    /// Returns the engine tariff.
    pub fn tariff(&self) -> Tariff {
        Tariff::new(self.consumption_price, self.feed_in_price)
    }
}

/// CSV dataset location, column names and observation window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// Dataset path; `None` runs the synthetic community instead.
    pub path: Option<PathBuf>,
    /// Member identifier column.
    pub member_column: String,
    /// Timestamp column.
    pub timestamp_column: String,
    /// Consumption `Wc` column.
    pub consumption_column: String,
    /// Own generation `Wg` column.
    pub own_generation_column: String,
    /// Shared generation `Wgs` column.
    pub shared_generation_column: String,
    /// Explicit `chrono` format for the timestamp column.
    pub timestamp_format: Option<String>,
    /// First day of the observation window (inclusive, `YYYY-MM-DD`).
    pub start_day: Option<String>,
    /// Last day of the observation window (inclusive, `YYYY-MM-DD`).
    pub end_day: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            member_column: "Member".to_string(),
            timestamp_column: "TIMESTAMP_R".to_string(),
            consumption_column: "Wci".to_string(),
            own_generation_column: "Wgi".to_string(),
            shared_generation_column: "Wgsi".to_string(),
            timestamp_format: None,
            start_day: None,
            end_day: None,
        }
    }
}

impl DatasetConfig {
    /// Parses the observation window bounds.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either bound is not a `YYYY-MM-DD` date.
    pub fn window(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ConfigError> {
        let start = parse_day("dataset.start_day", self.start_day.as_deref())?;
        let end = parse_day("dataset.end_day", self.end_day.as_deref())?;
        Ok((start, end))
    }
}

fn parse_day(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ConfigError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| ConfigError {
                field: field.to_string(),
                message: format!("expected YYYY-MM-DD, got \"{s}\": {e}"),
            })
        })
        .transpose()
}

/// Handling of undefined values in window sums.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// `"propagate"` or `"skip"`.
    pub undefined: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            undefined: "propagate".to_string(),
        }
    }
}

impl SummaryConfig {
    /// Returns the handling named by `undefined`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for any other value.
    pub fn handling(&self) -> Result<UndefinedHandling, ConfigError> {
        match self.undefined.as_str() {
            "propagate" => Ok(UndefinedHandling::Propagate),
            "skip" => Ok(UndefinedHandling::Skip),
            other => Err(ConfigError {
                field: "summary.undefined".into(),
                message: format!("must be \"propagate\" or \"skip\", got \"{other}\""),
            }),
        }
    }
}

/// Parameters of the seeded synthetic community.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Number of members (must be > 0).
    pub members: usize,
    /// Members with rooftop PV; the rest are pure consumers.
    pub prosumers: usize,
    /// Days to generate (must be > 0).
    pub days: usize,
    /// Metering intervals per day (1..=1440).
    pub steps_per_day: usize,
    /// Master random seed.
    pub seed: u64,
    /// First day (`YYYY-MM-DD`).
    pub start_date: String,
    /// Baseline household demand (kW).
    pub base_kw: f64,
    /// Sinusoidal demand amplitude (kW).
    pub amp_kw: f64,
    /// Demand phase offset (radians).
    pub phase_rad: f64,
    /// Demand noise standard deviation (kW).
    pub load_noise_std: f64,
    /// Rooftop PV peak per prosumer (kW).
    pub pv_kw_peak: f64,
    /// Community plant peak, split equally among members (kW).
    pub shared_kw_peak: f64,
    /// Sunrise interval (inclusive).
    pub sunrise_idx: usize,
    /// Sunset interval (exclusive).
    pub sunset_idx: usize,
    /// Relative PV noise.
    pub pv_noise_std: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            members: 6,
            prosumers: 3,
            days: 2,
            steps_per_day: 24,
            seed: 42,
            start_date: "2021-01-01".to_string(),
            base_kw: 0.8,
            amp_kw: 0.7,
            phase_rad: 1.2,
            load_noise_std: 0.05,
            pv_kw_peak: 3.0,
            shared_kw_peak: 4.0,
            sunrise_idx: 6,
            sunset_idx: 18,
            pv_noise_std: 0.05,
        }
    }
}

impl SyntheticConfig {
    /// Parses `start_date`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if it is not a `YYYY-MM-DD` date.
    pub fn start(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT).map_err(|e| ConfigError {
            field: "synthetic.start_date".into(),
            message: format!("expected YYYY-MM-DD, got \"{}\": {e}", self.start_date),
        })
    }
}

/// Optional CSV outputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Per-record allocation table.
    pub allocations: Option<PathBuf>,
    /// Per-member window summaries.
    pub members: Option<PathBuf>,
    /// Hour-of-day profiles per member.
    pub profiles: Option<PathBuf>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"tariff.feed_in_price"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl RunConfig {
    /// Returns the baseline run: default tariff and synthetic community.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the no-feed-in preset: exports earn nothing.
    ///
    /// A feed-in price of zero is the lowest [`validate`](Self::validate)
    /// accepts; exporters are never charged for what they feed in.
    pub fn no_feed_in() -> Self {
        Self {
            tariff: TariffConfig {
                feed_in_price: 0.0,
                ..TariffConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the sunny preset: larger PV and a longer daylight window.
    pub fn sunny() -> Self {
        Self {
            synthetic: SyntheticConfig {
                prosumers: 4,
                pv_kw_peak: 6.0,
                shared_kw_peak: 8.0,
                sunrise_idx: 5,
                sunset_idx: 20,
                ..SyntheticConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "no_feed_in", "sunny"];

    /// Loads a run configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "no_feed_in" => Ok(Self::no_feed_in()),
            "sunny" => Ok(Self::sunny()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a run configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a run configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let t = &self.tariff;
        for (field, price) in [
            ("tariff.consumption_price", t.consumption_price),
            ("tariff.feed_in_price", t.feed_in_price),
        ] {
            if !price.is_finite() || price < 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be a finite number >= 0".into(),
                });
            }
        }

        let d = &self.dataset;
        for (field, column) in [
            ("dataset.member_column", &d.member_column),
            ("dataset.timestamp_column", &d.timestamp_column),
            ("dataset.consumption_column", &d.consumption_column),
            ("dataset.own_generation_column", &d.own_generation_column),
            (
                "dataset.shared_generation_column",
                &d.shared_generation_column,
            ),
        ] {
            if column.trim().is_empty() {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            }
        }
        match d.window() {
            Ok((Some(start), Some(end))) if start > end => errors.push(ConfigError {
                field: "dataset.start_day".into(),
                message: "must be <= dataset.end_day".into(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(e),
        }

        if let Err(e) = self.summary.handling() {
            errors.push(e);
        }

        let s = &self.synthetic;
        if s.members == 0 {
            errors.push(ConfigError {
                field: "synthetic.members".into(),
                message: "must be > 0".into(),
            });
        }
        if s.prosumers > s.members {
            errors.push(ConfigError {
                field: "synthetic.prosumers".into(),
                message: "must be <= synthetic.members".into(),
            });
        }
        if s.days == 0 {
            errors.push(ConfigError {
                field: "synthetic.days".into(),
                message: "must be > 0".into(),
            });
        }
        if s.steps_per_day == 0 || s.steps_per_day > 1440 {
            errors.push(ConfigError {
                field: "synthetic.steps_per_day".into(),
                message: "must be in 1..=1440".into(),
            });
        }
        if s.sunrise_idx >= s.sunset_idx {
            errors.push(ConfigError {
                field: "synthetic.sunrise_idx".into(),
                message: "must be < synthetic.sunset_idx".into(),
            });
        }
        if s.steps_per_day > 0 && s.sunset_idx > s.steps_per_day {
            errors.push(ConfigError {
                field: "synthetic.sunset_idx".into(),
                message: "must be <= synthetic.steps_per_day".into(),
            });
        }
        if let Err(e) = s.start() {
            errors.push(e);
        }

        errors
    }
}
