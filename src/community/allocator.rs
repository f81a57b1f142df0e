//! Per-timestamp gain allocation under the five value-share policies.

use std::collections::HashSet;

use crate::error::AllocationError;

use super::balance::CommunityPosition;
use super::marginal::marginal_contribution;
use super::metric::Metric;
use super::tariff::Tariff;
use super::types::{AllocationRecord, GroupAllocation, PolicyValues, Reading, truncate_to_minute};

/// Individual settlement of one member before any community gain.
struct Individual {
    net_deficit_kwh: f64,
    revenue: f64,
    cost: f64,
    payment: f64,
}

impl Individual {
    fn settle(r: &Reading, tariff: &Tariff) -> Self {
        let revenue = tariff.revenue(r.shared_generation_kwh + r.own_generation_kwh);
        let cost = tariff.cost(r.consumption_kwh);
        Self {
            net_deficit_kwh: r.net_deficit_kwh(),
            revenue,
            cost,
            payment: cost - revenue,
        }
    }
}

/// Allocates the community gain of one timestamp group among its members.
///
/// The group must hold exactly one reading per member, all on the same
/// minute. Membership against a declared member set is checked by the
/// batch layer; this function only rejects groups that are malformed on
/// their own.
///
/// Ratios with a zero denominator come out as [`Metric::Undefined`]:
/// - Marginal Contribution when the contributions sum to zero
/// - Generation-based when nobody generates
/// - Consumption-based when nobody consumes
///
/// A lone member has no community to be weighed against, so its CG and
/// Marginal Contribution gains are undefined as well.
///
/// # Arguments
///
/// * `readings` - All readings of one timestamp, one per member
/// * `tariff` - Consumption and feed-in rates
///
/// # Errors
///
/// Returns an [`AllocationError`] if the group is empty, repeats a member,
/// or spans more than one minute.
pub fn allocate_group(
    readings: &[Reading],
    tariff: &Tariff,
) -> Result<GroupAllocation, AllocationError> {
    let timestamp = check_group_shape(readings)?;
    let n = readings.len() as f64;

    // 1. Individual positions
    let individuals: Vec<Individual> = readings
        .iter()
        .map(|r| Individual::settle(r, tariff))
        .collect();
    let individual_payment: f64 = individuals.iter().map(|i| i.payment).sum();

    // 2. Community position and gain
    let position = CommunityPosition::of_readings(readings, tariff);
    let gain = individual_payment - position.net_payment();
    let equal_share = gain / n;

    // 3. CG deficit-imbalance scores
    let deficit_sum: f64 = individuals
        .iter()
        .map(|i| i.net_deficit_kwh)
        .filter(|wd| *wd > 0.0)
        .sum();
    let surplus_sum: f64 = individuals
        .iter()
        .map(|i| i.net_deficit_kwh)
        .filter(|wd| *wd < 0.0)
        .sum();

    // 4. Marginal contributions
    let marginals: Vec<_> = readings
        .iter()
        .map(|r| marginal_contribution(r, &position, tariff))
        .collect();
    let marginal_total: f64 = marginals.iter().map(|m| m.contribution).sum();

    // 5. Denominators of the proportional policies
    let generation_total: f64 = readings.iter().map(Reading::total_generation_kwh).sum();
    let consumption_total: f64 = readings.iter().map(|r| r.consumption_kwh).sum();

    let lone_member = readings.len() == 1;

    let records = readings
        .iter()
        .zip(&individuals)
        .zip(&marginals)
        .map(|((r, ind), mc)| {
            let cg_score = if lone_member {
                Metric::Undefined
            } else {
                cg_score(ind.net_deficit_kwh, deficit_sum, surplus_sum)
            };
            let mc_share = if lone_member {
                Metric::Undefined
            } else {
                Metric::ratio(mc.contribution, marginal_total)
            };

            let gains = PolicyValues {
                eq: Metric::from(equal_share),
                cg: cg_score * equal_share,
                mc: mc_share * gain,
                generation: Metric::ratio(r.total_generation_kwh(), generation_total) * gain,
                consumption: Metric::ratio(r.consumption_kwh, consumption_total) * gain,
            };
            let payments = gains.map(|_, g| Metric::Value(ind.payment) - *g);

            AllocationRecord {
                member: r.member.clone(),
                timestamp: r.timestamp,
                consumption_kwh: r.consumption_kwh,
                own_generation_kwh: r.own_generation_kwh,
                shared_generation_kwh: r.shared_generation_kwh,
                net_deficit_kwh: ind.net_deficit_kwh,
                revenue: ind.revenue,
                cost: ind.cost,
                payment: ind.payment,
                cg_score,
                counterfactual_net_kwh: mc.net_without_kwh,
                marginal_contribution: mc.contribution,
                mc_share,
                gains,
                payments,
            }
        })
        .collect();

    Ok(GroupAllocation {
        timestamp,
        position,
        individual_payment,
        gain,
        marginal_total,
        records,
    })
}

/// Deficit-imbalance score of one member.
///
/// Net importers score `1 - Wd / Σ(Wd > 0)`, net exporters
/// `1 + Wd / Σ(Wd < 0)`, balanced members 0.
fn cg_score(net_deficit_kwh: f64, deficit_sum: f64, surplus_sum: f64) -> Metric {
    if net_deficit_kwh > 0.0 {
        Metric::ratio(net_deficit_kwh, deficit_sum).map(|share| 1.0 - share)
    } else if net_deficit_kwh < 0.0 {
        Metric::ratio(net_deficit_kwh, surplus_sum).map(|share| 1.0 + share)
    } else {
        Metric::Value(0.0)
    }
}

/// Checks that the group is non-empty, single-minute, and has one reading per member.
///
/// Returns the group timestamp, truncated to the minute.
fn check_group_shape(readings: &[Reading]) -> Result<chrono::NaiveDateTime, AllocationError> {
    let first = readings.first().ok_or(AllocationError::EmptyGroup)?;
    let timestamp = truncate_to_minute(first.timestamp);

    let mut seen = HashSet::with_capacity(readings.len());
    for r in readings {
        let other = truncate_to_minute(r.timestamp);
        if other != timestamp {
            return Err(AllocationError::MixedTimestamps {
                first: timestamp,
                other,
            });
        }
        if !seen.insert(r.member.as_str()) {
            return Err(AllocationError::DuplicateReading {
                member: r.member.clone(),
            });
        }
    }
    Ok(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::types::Policy;
    use chrono::{NaiveDate, NaiveDateTime};

    const EPS: f64 = 1e-9;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid test timestamp")
    }

    fn reading(member: &str, wc: f64, wg: f64, wgs: f64) -> Reading {
        Reading::new(member, ts(12), wc, wg, wgs)
    }

    fn value(m: Metric) -> f64 {
        m.value().unwrap_or(f64::NAN)
    }

    fn two_member_group() -> Vec<Reading> {
        vec![reading("A", 10.0, 0.0, 0.0), reading("B", 0.0, 8.0, 0.0)]
    }

    #[test]
    fn two_member_reference_scenario() {
        let alloc = allocate_group(&two_member_group(), &Tariff::new(1.0, 0.5))
            .expect("reference group should allocate");

        assert_eq!(alloc.position.net_kwh, 2.0);
        assert_eq!(alloc.position.cost, 2.0);
        assert_eq!(alloc.position.revenue, 0.0);
        assert!((alloc.gain - 4.0).abs() < EPS);

        let a = &alloc.records[0];
        let b = &alloc.records[1];
        assert_eq!(a.payment, 10.0);
        assert_eq!(b.payment, -4.0);
        assert!((value(a.gains.eq) - 2.0).abs() < EPS);
        assert!((value(b.gains.eq) - 2.0).abs() < EPS);
        assert!((value(a.payments.eq) - 8.0).abs() < EPS);
        assert!((value(b.payments.eq) + 6.0).abs() < EPS);
    }

    #[test]
    fn two_member_policy_breakdown() {
        let alloc = allocate_group(&two_member_group(), &Tariff::new(1.0, 0.5))
            .expect("reference group should allocate");
        let (a, b) = (&alloc.records[0], &alloc.records[1]);

        // CG: A is the only importer -> score 0; B the only exporter -> score 2.
        assert!((value(a.cg_score) - 0.0).abs() < EPS);
        assert!((value(b.cg_score) - 2.0).abs() < EPS);
        assert!((value(a.gains.cg) - 0.0).abs() < EPS);
        assert!((value(b.gains.cg) - 4.0).abs() < EPS);

        // MC: A = -2, B = 12, total 10.
        assert!((a.marginal_contribution + 2.0).abs() < EPS);
        assert!((b.marginal_contribution - 12.0).abs() < EPS);
        assert!((alloc.marginal_total - 10.0).abs() < EPS);
        assert!((value(a.gains.mc) + 0.8).abs() < EPS);
        assert!((value(b.gains.mc) - 4.8).abs() < EPS);

        // Generation-based and consumption-based go to one member each.
        assert!((value(a.gains.generation) - 0.0).abs() < EPS);
        assert!((value(b.gains.generation) - 4.0).abs() < EPS);
        assert!((value(a.gains.consumption) - 4.0).abs() < EPS);
        assert!((value(b.gains.consumption) - 0.0).abs() < EPS);
    }

    #[test]
    fn conserving_policies_sum_to_community_gain() {
        let group = vec![
            reading("A", 4.0, 1.0, 0.5),
            reading("B", 1.0, 6.0, 0.5),
            reading("C", 3.0, 0.0, 0.5),
            reading("D", 0.5, 2.0, 0.5),
        ];
        let Ok(alloc) = allocate_group(&group, &Tariff::new(0.25, 0.1)) else {
            panic!("group should allocate");
        };
        for policy in Policy::ALL.into_iter().filter(|p| p.conserves_gain()) {
            let total = value(alloc.allocated_gain(policy));
            assert!(
                (total - alloc.gain).abs() < 1e-9,
                "{policy} allocates {total}, gain is {}",
                alloc.gain
            );
        }
    }

    #[test]
    fn lone_member_has_no_gain() {
        // Flat tariff: netting a member against itself saves nothing.
        let group = [reading("A", 5.0, 2.0, 1.0)];
        let Ok(alloc) = allocate_group(&group, &Tariff::new(0.4, 0.4)) else {
            panic!("single-member group should allocate");
        };
        assert!(alloc.gain.abs() < EPS);
        let r = &alloc.records[0];
        assert!(value(r.gains.eq).abs() < EPS);
        assert!(value(r.gains.generation).abs() < EPS);
        assert!(value(r.gains.consumption).abs() < EPS);
        assert_eq!(r.gains.cg, Metric::Undefined);
        assert_eq!(r.gains.mc, Metric::Undefined);
        assert_eq!(r.payments.mc, Metric::Undefined);
    }

    #[test]
    fn lone_member_gain_is_own_netting_under_price_spread() {
        // Self-consumed 3 kWh valued at the spread 1.0 - 0.5.
        let Ok(alloc) = allocate_group(&[reading("A", 5.0, 2.0, 1.0)], &Tariff::default()) else {
            panic!("single-member group should allocate");
        };
        assert!((alloc.gain - 1.5).abs() < EPS);
        assert!((value(alloc.records[0].gains.eq) - 1.5).abs() < EPS);
    }

    #[test]
    fn no_generation_makes_generation_based_undefined() {
        let group = vec![reading("A", 2.0, 0.0, 0.0), reading("B", 3.0, 0.0, 0.0)];
        let Ok(alloc) = allocate_group(&group, &Tariff::default()) else {
            panic!("group should allocate");
        };
        let records = &alloc.records;
        assert!(records.iter().all(|r| r.gains.generation.is_undefined()));
        assert!(records.iter().all(|r| r.gains.consumption.is_defined()));
    }

    #[test]
    fn no_consumption_makes_consumption_based_undefined() {
        let group = vec![reading("A", 0.0, 2.0, 0.0), reading("B", 0.0, 1.0, 0.0)];
        let Ok(alloc) = allocate_group(&group, &Tariff::default()) else {
            panic!("group should allocate");
        };
        let records = &alloc.records;
        assert!(records.iter().all(|r| r.gains.consumption.is_undefined()));
    }

    #[test]
    fn zero_marginal_total_is_undefined_not_zero() {
        // All-zero readings: every contribution is zero.
        let group = vec![reading("A", 0.0, 0.0, 0.0), reading("B", 0.0, 0.0, 0.0)];
        let Ok(alloc) = allocate_group(&group, &Tariff::default()) else {
            panic!("group should allocate");
        };
        assert_eq!(alloc.marginal_total, 0.0);
        assert!(alloc.records.iter().all(|r| r.mc_share.is_undefined()));
        assert!(alloc.records.iter().all(|r| r.gains.mc.is_undefined()));
    }

    #[test]
    fn balanced_member_scores_zero() {
        let group = vec![
            reading("A", 2.0, 2.0, 0.0),
            reading("B", 5.0, 0.0, 0.0),
            reading("C", 0.0, 3.0, 0.0),
        ];
        let Ok(alloc) = allocate_group(&group, &Tariff::default()) else {
            panic!("group should allocate");
        };
        assert_eq!(alloc.records[0].cg_score, Metric::Value(0.0));
    }

    #[test]
    fn equal_share_is_permutation_invariant() {
        let group = vec![
            reading("A", 4.0, 1.0, 0.0),
            reading("B", 1.0, 6.0, 0.0),
            reading("C", 3.0, 0.0, 1.0),
        ];
        let mut reversed = group.clone();
        reversed.reverse();
        let (Ok(fwd), Ok(rev)) = (
            allocate_group(&group, &Tariff::default()),
            allocate_group(&reversed, &Tariff::default()),
        ) else {
            panic!("groups should allocate");
        };
        for r in &fwd.records {
            let other = rev.records.iter().find(|o| o.member == r.member);
            assert_eq!(other.map(|o| o.gains.eq), Some(r.gains.eq));
        }
    }

    #[test]
    fn gains_scale_with_energy() {
        let group = vec![
            reading("A", 4.0, 1.0, 0.5),
            reading("B", 1.0, 6.0, 0.0),
            reading("C", 3.0, 0.0, 1.0),
        ];
        let scaled: Vec<Reading> = group.iter().map(|r| r.scaled(3.0)).collect();
        let tariff = Tariff::new(0.2, 0.07);
        let (Ok(base), Ok(big)) = (
            allocate_group(&group, &tariff),
            allocate_group(&scaled, &tariff),
        ) else {
            panic!("groups should allocate");
        };
        for (r, s) in base.records.iter().zip(&big.records) {
            for policy in Policy::ALL {
                let expected = value(*r.gains.get(policy)) * 3.0;
                let got = value(*s.gains.get(policy));
                assert!(
                    (expected - got).abs() < 1e-9,
                    "{policy}: {expected} vs {got}"
                );
            }
        }
    }

    #[test]
    fn empty_group_is_rejected() {
        assert_eq!(
            allocate_group(&[], &Tariff::default()),
            Err(AllocationError::EmptyGroup)
        );
    }

    #[test]
    fn duplicate_member_is_rejected() {
        let group = vec![reading("A", 1.0, 0.0, 0.0), reading("A", 2.0, 0.0, 0.0)];
        assert_eq!(
            allocate_group(&group, &Tariff::default()),
            Err(AllocationError::DuplicateReading {
                member: "A".to_string()
            })
        );
    }

    #[test]
    fn records_keep_row_timestamps_within_the_minute() {
        fn at(second: u32) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2021, 1, 1)
                .and_then(|d| d.and_hms_opt(10, 15, second))
                .expect("valid test timestamp")
        }

        let group = vec![
            Reading::new("A", at(42), 3.0, 0.0, 0.0),
            Reading::new("B", at(5), 0.0, 2.0, 0.0),
        ];
        let alloc = allocate_group(&group, &Tariff::default()).expect("same minute");
        assert_eq!(alloc.timestamp, at(0));
        assert_eq!(alloc.records[0].timestamp, at(42));
        assert_eq!(alloc.records[1].timestamp, at(5));
    }

    #[test]
    fn mixed_minutes_are_rejected() {
        let group = vec![
            reading("A", 1.0, 0.0, 0.0),
            Reading::new("B", ts(13), 1.0, 0.0, 0.0),
        ];
        assert!(matches!(
            allocate_group(&group, &Tariff::default()),
            Err(AllocationError::MixedTimestamps { .. })
        ));
    }
}
