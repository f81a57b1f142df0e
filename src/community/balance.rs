//! Community net position and its settlement against the grid.

use serde::Serialize;

use super::tariff::Tariff;
use super::types::Reading;

/// Community-level net energy position for one timestamp and its settlement.
///
/// Net position convention:
/// - Positive `net_kwh` = the community imports (net consumer)
/// - Negative `net_kwh` = the community exports (net producer)
///
/// At most one of `cost` and `revenue` is nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommunityPosition {
    /// Net position `NetC = ΣWc - ΣWgs - ΣWg` (kWh).
    pub net_kwh: f64,
    /// Cost of the net import, `NetC × consumption price` when importing.
    pub cost: f64,
    /// Revenue of the net export, `|NetC| × feed-in price` when exporting.
    pub revenue: f64,
}

impl CommunityPosition {
    /// Settles a net position against the tariff.
    ///
    /// # Arguments
    ///
    /// * `net_kwh` - Community net position (positive = import)
    /// * `tariff` - Consumption and feed-in rates
    pub fn settle(net_kwh: f64, tariff: &Tariff) -> Self {
        if net_kwh < 0.0 {
            Self {
                net_kwh,
                cost: 0.0,
                revenue: tariff.revenue(net_kwh.abs()),
            }
        } else {
            Self {
                net_kwh,
                cost: tariff.cost(net_kwh),
                revenue: 0.0,
            }
        }
    }

    /// Computes and settles the net position of a set of readings.
    pub fn of_readings(readings: &[Reading], tariff: &Tariff) -> Self {
        Self::settle(community_net_kwh(readings), tariff)
    }

    /// Net payment of the community to the grid, `cost - revenue`.
    pub fn net_payment(&self) -> f64 {
        self.cost - self.revenue
    }
}

/// Computes `ΣWc - ΣWgs - ΣWg` over the readings.
///
/// Pure summation over each component, matching the per-member net deficit
/// definition so the two stay consistent.
pub fn community_net_kwh(readings: &[Reading]) -> f64 {
    let consumption: f64 = readings.iter().map(|r| r.consumption_kwh).sum();
    let shared: f64 = readings.iter().map(|r| r.shared_generation_kwh).sum();
    let own: f64 = readings.iter().map(|r| r.own_generation_kwh).sum();
    consumption - shared - own
}
