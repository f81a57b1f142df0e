//! Counterfactual "member absent" recomputation for the Marginal Contribution policy.

use super::balance::CommunityPosition;
use super::tariff::Tariff;
use super::types::Reading;

/// Counterfactual figures for one member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginalContribution {
    /// Community net position with the member's consumption and own generation removed (kWh).
    pub net_without_kwh: f64,
    /// Marginal contribution `MC` of the member.
    pub contribution: f64,
}

/// Computes a member's marginal contribution against the full community position.
///
/// Only the member's consumption and own generation are taken out of the
/// community net position. Shared generation stays in: it is attributed to
/// the receiving members, not to whoever produced it.
///
/// The counterfactual settlement clamps the price products,
/// `|min(NetC' × feed-in, 0)|` and `max(NetC' × consumption, 0)`, and the
/// contribution is `(Cost - Rev) - (Rev' - Cost')`.
///
/// # Arguments
///
/// * `member` - Reading of the member being removed
/// * `position` - Settled position of the full community
/// * `tariff` - Consumption and feed-in rates
pub fn marginal_contribution(
    member: &Reading,
    position: &CommunityPosition,
    tariff: &Tariff,
) -> MarginalContribution {
    let net_without_kwh = position.net_kwh - (member.consumption_kwh - member.own_generation_kwh);

    let revenue_without = (net_without_kwh * tariff.feed_in_price).min(0.0).abs();
    let cost_without = (net_without_kwh * tariff.consumption_price).max(0.0);

    let contribution = (position.cost - position.revenue) - (revenue_without - cost_without);

    MarginalContribution {
        net_without_kwh,
        contribution,
    }
}
