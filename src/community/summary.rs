//! Per-member totals and ratios over the whole observation window.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::metric::{Metric, UndefinedHandling};
use super::types::{AllocationRecord, PolicyValues};

/// Window totals and derived ratios for one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    /// Member identifier.
    pub member: String,
    /// Number of allocation records summed.
    pub readings: usize,
    /// Total consumption `ΣWc` (kWh).
    pub consumption_kwh: f64,
    /// Total own generation `ΣWg` (kWh).
    pub own_generation_kwh: f64,
    /// Total shared generation `ΣWgs` (kWh).
    pub shared_generation_kwh: f64,
    /// Total own plus shared generation `ΣWgT` (kWh).
    pub total_generation_kwh: f64,
    /// Total self-consumed generation `ΣWusedG` (kWh).
    pub self_consumed_kwh: f64,
    /// Total individual revenue `ΣRevI`.
    pub revenue: f64,
    /// Total individual cost `ΣCostI`.
    pub cost: f64,
    /// Total individual net payment `ΣPayI`.
    pub payment: f64,
    /// Total marginal contribution `ΣMC`.
    pub marginal_contribution: f64,
    /// Total gain per policy.
    pub gains: PolicyValues<Metric>,
    /// Total post-allocation payment per policy.
    pub payments: PolicyValues<Metric>,
    /// Cost-savings fraction `CSi = G / |PayI|` per policy.
    pub cost_savings: PolicyValues<Metric>,
    /// Gain per generated kWh `Xi = G / WgT` per policy.
    pub gain_per_generation: PolicyValues<Metric>,
    /// Self-sufficiency `SSIi = WusedG / Wc`.
    pub self_sufficiency: Metric,
    /// Self-consumption `SCIi = WusedG / WgT`.
    pub self_consumption: Metric,
}

#[derive(Default)]
struct Totals {
    readings: usize,
    consumption_kwh: f64,
    own_generation_kwh: f64,
    shared_generation_kwh: f64,
    total_generation_kwh: f64,
    self_consumed_kwh: f64,
    revenue: f64,
    cost: f64,
    payment: f64,
    marginal_contribution: f64,
    gains: PolicyValues<Metric>,
    payments: PolicyValues<Metric>,
}

impl Totals {
    fn add(&mut self, r: &AllocationRecord, handling: UndefinedHandling) {
        self.readings += 1;
        self.consumption_kwh += r.consumption_kwh;
        self.own_generation_kwh += r.own_generation_kwh;
        self.shared_generation_kwh += r.shared_generation_kwh;
        self.total_generation_kwh += r.total_generation_kwh();
        self.self_consumed_kwh += r.self_consumed_kwh();
        self.revenue += r.revenue;
        self.cost += r.cost;
        self.payment += r.payment;
        self.marginal_contribution += r.marginal_contribution;
        self.gains = self
            .gains
            .map(|p, acc| acc.accumulate(*r.gains.get(p), handling));
        self.payments = self
            .payments
            .map(|p, acc| acc.accumulate(*r.payments.get(p), handling));
    }

    fn finish(self, member: String) -> MemberSummary {
        let cost_savings = self
            .gains
            .map(|_, g| g.divide(Metric::Value(self.payment.abs())));
        let gain_per_generation = self
            .gains
            .map(|_, g| g.divide(Metric::Value(self.total_generation_kwh)));

        MemberSummary {
            member,
            readings: self.readings,
            consumption_kwh: self.consumption_kwh,
            own_generation_kwh: self.own_generation_kwh,
            shared_generation_kwh: self.shared_generation_kwh,
            total_generation_kwh: self.total_generation_kwh,
            self_consumed_kwh: self.self_consumed_kwh,
            revenue: self.revenue,
            cost: self.cost,
            payment: self.payment,
            marginal_contribution: self.marginal_contribution,
            gains: self.gains,
            payments: self.payments,
            cost_savings,
            gain_per_generation,
            self_sufficiency: Metric::ratio(self.self_consumed_kwh, self.consumption_kwh),
            self_consumption: Metric::ratio(self.self_consumed_kwh, self.total_generation_kwh),
        }
    }
}

/// Sums allocation records per member and derives the member ratios.
///
/// Self-consumed generation is taken per reading as `min(Wc, WgT)` before
/// summing. Summaries come back sorted by member identifier.
///
/// # Arguments
///
/// * `records` - The concatenated allocation table
/// * `handling` - Whether undefined per-record gains disqualify the totals
///   they feed or are left out of them
pub fn summarize_members<'a>(
    records: impl IntoIterator<Item = &'a AllocationRecord>,
    handling: UndefinedHandling,
) -> Vec<MemberSummary> {
    let mut totals: BTreeMap<&'a str, Totals> = BTreeMap::new();
    for r in records {
        totals
            .entry(r.member.as_str())
            .or_default()
            .add(r, handling);
    }
    totals
        .into_iter()
        .map(|(member, t)| t.finish(member.to_string()))
        .collect()
}

impl fmt::Display for MemberSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} Wc={:.2} kWh  WgT={:.2} kWh  PayI={:.2}  SSI={:.2}  SCI={:.2}",
            self.member,
            self.consumption_kwh,
            self.total_generation_kwh,
            self.payment,
            self.self_sufficiency,
            self.self_consumption,
        )?;
        for (policy, gain) in self.gains.iter() {
            writeln!(
                f,
                "    {:<24} G={:>10.3}  CS={:>9.3}  X={:>9.3}",
                policy,
                gain,
                self.cost_savings.get(policy),
                self.gain_per_generation.get(policy),
            )?;
        }
        Ok(())
    }
}
