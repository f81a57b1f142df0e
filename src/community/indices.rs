//! Community-level indices reduced from member summaries.

use std::fmt;

use serde::Serialize;

use super::metric::{Metric, UndefinedHandling};
use super::summary::MemberSummary;
use super::types::PolicyValues;

/// Community scalars for the whole observation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityIndices {
    /// Number of members the indices were computed over.
    pub members: usize,
    /// Cost-savings ratio `CS_EC = ΣG_eq / ΣPayI`.
    pub cost_savings: Metric,
    /// Self-sufficiency `SSI_EC = min(ΣWgT, ΣWc) / ΣWc`.
    pub self_sufficiency: Metric,
    /// Self-consumption `SCI_EC = min(ΣWgT, ΣWc) / ΣWgT`.
    pub self_consumption: Metric,
    /// Jain's fairness index over member `Xi` per policy.
    pub fairness: PolicyValues<Metric>,
}

impl CommunityIndices {
    /// Reduces member summaries to the community indices.
    ///
    /// An empty slice yields `NotApplicable` everywhere.
    ///
    /// # Arguments
    ///
    /// * `members` - Member summaries for the window
    /// * `handling` - How undefined member gains enter `ΣG_eq`
    pub fn from_summaries(members: &[MemberSummary], handling: UndefinedHandling) -> Self {
        if members.is_empty() {
            return Self {
                members: 0,
                cost_savings: Metric::NotApplicable,
                self_sufficiency: Metric::NotApplicable,
                self_consumption: Metric::NotApplicable,
                fairness: PolicyValues::from_fn(|_| Metric::NotApplicable),
            };
        }

        let consumption: f64 = members.iter().map(|m| m.consumption_kwh).sum();
        let generation: f64 = members.iter().map(|m| m.total_generation_kwh).sum();
        let payment: f64 = members.iter().map(|m| m.payment).sum();
        let mut gain_eq = Metric::Value(0.0);
        for m in members {
            gain_eq = gain_eq.accumulate(m.gains.eq, handling);
        }
        let used = generation.min(consumption);

        Self {
            members: members.len(),
            cost_savings: gain_eq.divide(Metric::Value(payment)),
            self_sufficiency: Metric::ratio(used, consumption),
            self_consumption: Metric::ratio(used, generation),
            fairness: PolicyValues::from_fn(|p| {
                jain_index(members.iter().map(|m| *m.gain_per_generation.get(p)))
            }),
        }
    }
}

/// Jain's fairness index `(Σx)² / (n·Σx²)`.
///
/// Undefined when any term is undefined or every term is zero.
pub fn jain_index(values: impl IntoIterator<Item = Metric>) -> Metric {
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        let Metric::Value(x) = v else {
            return if v.is_undefined() {
                Metric::Undefined
            } else {
                Metric::NotApplicable
            };
        };
        n += 1;
        sum += x;
        sum_sq += x * x;
    }
    if n == 0 {
        return Metric::NotApplicable;
    }
    Metric::ratio(sum * sum, n as f64 * sum_sq)
}

impl fmt::Display for CommunityIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Community Indices ({} members) ---", self.members)?;
        writeln!(f, "Cost savings (CS_EC):      {:.2}", self.cost_savings)?;
        writeln!(f, "Self-sufficiency (SSI_EC): {:.2}", self.self_sufficiency)?;
        writeln!(f, "Self-consumption (SCI_EC): {:.2}", self.self_consumption)?;
        let mut rows = self.fairness.iter().peekable();
        while let Some((policy, fi)) = rows.next() {
            let label = format!("FI_EC_{}", policy.code());
            if rows.peek().is_some() {
                writeln!(f, "{label:<10} {policy:<24} {fi:.2}")?;
            } else {
                write!(f, "{label:<10} {policy:<24} {fi:.2}")?;
            }
        }
        Ok(())
    }
}
