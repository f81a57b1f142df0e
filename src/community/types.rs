//! Core community types: readings, allocation policies, and allocation records.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::balance::CommunityPosition;
use super::metric::Metric;

/// One metered reading for one member at one timestamp.
///
/// All energy quantities are non-negative kWh for the metering interval.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ec_value_share::community::types::Reading;
///
/// let ts = NaiveDate::from_ymd_opt(2021, 1, 1)
///     .and_then(|d| d.and_hms_opt(12, 0, 0))
///     .expect("valid timestamp");
/// let r = Reading::new("A", ts, 10.0, 3.0, 1.0);
/// assert_eq!(r.total_generation_kwh(), 4.0);
/// assert_eq!(r.net_deficit_kwh(), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Member identifier.
    pub member: String,
    /// Start of the metering interval.
    pub timestamp: NaiveDateTime,
    /// Consumption `Wc` (kWh).
    pub consumption_kwh: f64,
    /// Own generation `Wg` (kWh).
    pub own_generation_kwh: f64,
    /// Shared generation received from community assets `Wgs` (kWh).
    pub shared_generation_kwh: f64,
}

impl Reading {
    /// Creates a reading.
    pub fn new(
        member: impl Into<String>,
        timestamp: NaiveDateTime,
        consumption_kwh: f64,
        own_generation_kwh: f64,
        shared_generation_kwh: f64,
    ) -> Self {
        Self {
            member: member.into(),
            timestamp,
            consumption_kwh,
            own_generation_kwh,
            shared_generation_kwh,
        }
    }

    /// Own plus shared generation `WgT`.
    pub fn total_generation_kwh(&self) -> f64 {
        self.own_generation_kwh + self.shared_generation_kwh
    }

    /// Net deficit `Wd = Wc - Wgs - Wg`; positive for a net importer.
    pub fn net_deficit_kwh(&self) -> f64 {
        self.consumption_kwh - self.shared_generation_kwh - self.own_generation_kwh
    }

    /// Generation consumed by the member itself, `min(Wc, WgT)`.
    pub fn self_consumed_kwh(&self) -> f64 {
        self.consumption_kwh.min(self.total_generation_kwh())
    }

    /// Returns a copy with every energy quantity multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            consumption_kwh: self.consumption_kwh * factor,
            own_generation_kwh: self.own_generation_kwh * factor,
            shared_generation_kwh: self.shared_generation_kwh * factor,
            ..self.clone()
        }
    }
}

/// Truncates a timestamp to whole minutes, the grouping granularity.
pub fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// A gain-allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Flat split of the community gain.
    EqualShare,
    /// Equal share weighted by the member's deficit-imbalance score.
    ConsumptionGeneration,
    /// Split proportional to each member's marginal contribution.
    MarginalContribution,
    /// Split proportional to own plus shared generation.
    GenerationBased,
    /// Split proportional to consumption.
    ConsumptionBased,
}

impl Policy {
    /// All policies in reporting order.
    pub const ALL: [Policy; 5] = [
        Policy::EqualShare,
        Policy::ConsumptionGeneration,
        Policy::MarginalContribution,
        Policy::GenerationBased,
        Policy::ConsumptionBased,
    ];

    /// Short code used in column names (`G_eq`, `FI_EC_mc`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Policy::EqualShare => "eq",
            Policy::ConsumptionGeneration => "cg",
            Policy::MarginalContribution => "mc",
            Policy::GenerationBased => "G",
            Policy::ConsumptionBased => "C",
        }
    }

    /// Whether per-timestamp gains of this policy sum to the community gain.
    ///
    /// CG scales the equal share rather than redistributing the gain.
    pub fn conserves_gain(self) -> bool {
        !matches!(self, Policy::ConsumptionGeneration)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Policy::EqualShare => "Equal Share",
            Policy::ConsumptionGeneration => "Consumption/Generation",
            Policy::MarginalContribution => "Marginal Contribution",
            Policy::GenerationBased => "Generation-based",
            Policy::ConsumptionBased => "Consumption-based",
        };
        f.pad(label)
    }
}

/// One value per allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PolicyValues<T> {
    /// Equal Share.
    pub eq: T,
    /// Consumption/Generation-weighted.
    pub cg: T,
    /// Marginal Contribution.
    pub mc: T,
    /// Generation-based.
    #[serde(rename = "G")]
    pub generation: T,
    /// Consumption-based.
    #[serde(rename = "C")]
    pub consumption: T,
}

impl<T> PolicyValues<T> {
    /// Builds the set by evaluating `f` for every policy.
    pub fn from_fn(mut f: impl FnMut(Policy) -> T) -> Self {
        Self {
            eq: f(Policy::EqualShare),
            cg: f(Policy::ConsumptionGeneration),
            mc: f(Policy::MarginalContribution),
            generation: f(Policy::GenerationBased),
            consumption: f(Policy::ConsumptionBased),
        }
    }

    /// Returns the value for `policy`.
    pub fn get(&self, policy: Policy) -> &T {
        match policy {
            Policy::EqualShare => &self.eq,
            Policy::ConsumptionGeneration => &self.cg,
            Policy::MarginalContribution => &self.mc,
            Policy::GenerationBased => &self.generation,
            Policy::ConsumptionBased => &self.consumption,
        }
    }

    /// Iterates `(policy, value)` pairs in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Policy, &T)> {
        Policy::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Maps every value through `f`.
    pub fn map<U>(&self, mut f: impl FnMut(Policy, &T) -> U) -> PolicyValues<U> {
        PolicyValues::from_fn(|p| f(p, self.get(p)))
    }
}

/// Derived allocation figures for one member at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRecord {
    /// Member identifier.
    pub member: String,
    /// Timestamp of the input reading, as metered.
    pub timestamp: NaiveDateTime,
    /// Consumption `Wc` (kWh).
    pub consumption_kwh: f64,
    /// Own generation `Wg` (kWh).
    pub own_generation_kwh: f64,
    /// Shared generation `Wgs` (kWh).
    pub shared_generation_kwh: f64,
    /// Net deficit `Wd` (kWh; positive = net importer).
    pub net_deficit_kwh: f64,
    /// Individual revenue `RevI`.
    pub revenue: f64,
    /// Individual cost `CostI`.
    pub cost: f64,
    /// Individual net payment before community gain `PayI`.
    pub payment: f64,
    /// Deficit-imbalance score `DIcg` used by the CG policy.
    pub cg_score: Metric,
    /// Community net position with this member removed (kWh).
    pub counterfactual_net_kwh: f64,
    /// Marginal contribution `MC` of this member.
    pub marginal_contribution: f64,
    /// Normalized marginal contribution `DImc`.
    pub mc_share: Metric,
    /// Gain allocated under each policy.
    pub gains: PolicyValues<Metric>,
    /// Payment after gain allocation under each policy, `PayI - G`.
    pub payments: PolicyValues<Metric>,
}

impl AllocationRecord {
    /// Own plus shared generation `WgT` (kWh).
    pub fn total_generation_kwh(&self) -> f64 {
        self.own_generation_kwh + self.shared_generation_kwh
    }

    /// Generation consumed by the member itself, `min(Wc, WgT)` (kWh).
    pub fn self_consumed_kwh(&self) -> f64 {
        self.consumption_kwh.min(self.total_generation_kwh())
    }
}

impl fmt::Display for AllocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<8} | Wc={:>7.3} Wg={:>7.3} Wgs={:>7.3} Wd={:>8.3} | PayI={:>8.3} | \
             G(eq={:.3}, cg={:.3}, mc={:.3}, G={:.3}, C={:.3})",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.member,
            self.consumption_kwh,
            self.own_generation_kwh,
            self.shared_generation_kwh,
            self.net_deficit_kwh,
            self.payment,
            self.gains.eq,
            self.gains.cg,
            self.gains.mc,
            self.gains.generation,
            self.gains.consumption,
        )
    }
}

/// Allocation of one timestamp group: community figures plus per-member records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAllocation {
    /// Timestamp of the group.
    pub timestamp: NaiveDateTime,
    /// Community net position, cost, and revenue.
    pub position: CommunityPosition,
    /// Sum of individual net payments `ΣPayI`.
    pub individual_payment: f64,
    /// Community gain `ECGain` distributed by the policies.
    pub gain: f64,
    /// Sum of marginal contributions over the group.
    pub marginal_total: f64,
    /// Per-member records in input order.
    pub records: Vec<AllocationRecord>,
}

impl GroupAllocation {
    /// Sum of allocated gains for `policy` across members.
    pub fn allocated_gain(&self, policy: Policy) -> Metric {
        self.records.iter().map(|r| *r.gains.get(policy)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid test timestamp")
    }

    #[test]
    fn net_deficit_sign_convention() {
        let importer = Reading::new("A", ts(), 5.0, 1.0, 1.0);
        let exporter = Reading::new("B", ts(), 1.0, 4.0, 0.0);
        assert_eq!(importer.net_deficit_kwh(), 3.0);
        assert_eq!(exporter.net_deficit_kwh(), -3.0);
    }

    #[test]
    fn self_consumed_is_bounded_by_both_sides() {
        let surplus = Reading::new("A", ts(), 2.0, 5.0, 0.0);
        let deficit = Reading::new("A", ts(), 6.0, 1.0, 2.0);
        assert_eq!(surplus.self_consumed_kwh(), 2.0);
        assert_eq!(deficit.self_consumed_kwh(), 3.0);
    }

    #[test]
    fn truncation_drops_seconds_only() {
        let t = NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|d| d.and_hms_milli_opt(10, 15, 42, 500))
            .expect("valid test timestamp");
        let expected = NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 15, 0))
            .expect("valid test timestamp");
        assert_eq!(truncate_to_minute(t), expected);
    }

    #[test]
    fn policy_codes_are_distinct() {
        let codes: Vec<&str> = Policy::ALL.into_iter().map(Policy::code).collect();
        assert_eq!(codes, ["eq", "cg", "mc", "G", "C"]);
    }

    #[test]
    fn only_cg_is_exempt_from_conservation() {
        let exempt: Vec<Policy> = Policy::ALL
            .into_iter()
            .filter(|p| !p.conserves_gain())
            .collect();
        assert_eq!(exempt, vec![Policy::ConsumptionGeneration]);
    }

    #[test]
    fn policy_values_get_matches_from_fn() {
        let values = PolicyValues::from_fn(|p| p.code().len());
        assert_eq!(*values.get(Policy::EqualShare), 2);
        assert_eq!(*values.get(Policy::GenerationBased), 1);
        assert_eq!(values.iter().count(), 5);
    }
}
