//! Two-rate tariff applied to individual and community energy positions.

use serde::Serialize;

/// Unit prices for energy drawn from and fed into the wider grid.
///
/// Prices are per kWh in whatever currency unit the readings are billed in.
/// Neither price is assumed positive; a zero feed-in price is a valid tariff.
///
/// # Examples
///
/// ```
/// use ec_value_share::community::tariff::Tariff;
///
/// let tariff = Tariff::new(1.0, 0.5);
/// assert_eq!(tariff.cost(10.0), 10.0);
/// assert_eq!(tariff.revenue(8.0), 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tariff {
    /// Price paid per kWh consumed from the grid.
    pub consumption_price: f64,
    /// Price received per kWh fed into the grid.
    pub feed_in_price: f64,
}

impl Tariff {
    /// Creates a tariff from its two rates.
    pub fn new(consumption_price: f64, feed_in_price: f64) -> Self {
        Self {
            consumption_price,
            feed_in_price,
        }
    }

    /// Cost of consuming `kwh` at the consumption price.
    pub fn cost(&self, kwh: f64) -> f64 {
        kwh * self.consumption_price
    }

    /// Revenue from feeding `kwh` in at the feed-in price.
    pub fn revenue(&self, kwh: f64) -> f64 {
        kwh * self.feed_in_price
    }
}

impl Default for Tariff {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}
