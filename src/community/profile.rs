//! Hour-of-day profiles per member: mean energy flows and summed gains.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use super::metric::{Metric, UndefinedHandling};
use super::types::{AllocationRecord, PolicyValues};

/// Profile of one member at one hour of day, over every day in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyProfile {
    /// Member identifier.
    pub member: String,
    /// Hour of day, `0..=23`.
    pub hour: u32,
    /// Number of records that fell in this hour.
    pub samples: usize,
    /// Mean consumption (kWh).
    pub mean_consumption_kwh: f64,
    /// Mean own generation (kWh).
    pub mean_own_generation_kwh: f64,
    /// Mean shared generation (kWh).
    pub mean_shared_generation_kwh: f64,
    /// Gains summed per policy.
    pub gains: PolicyValues<Metric>,
}

#[derive(Default)]
struct Bucket {
    samples: usize,
    consumption: f64,
    own_generation: f64,
    shared_generation: f64,
    gains: PolicyValues<Metric>,
}

/// Buckets allocation records by member and hour of day.
///
/// Output is sorted by member, then hour; hours with no record are absent.
pub fn hourly_profiles<'a>(
    records: impl IntoIterator<Item = &'a AllocationRecord>,
    handling: UndefinedHandling,
) -> Vec<HourlyProfile> {
    let mut buckets: BTreeMap<(&'a str, u32), Bucket> = BTreeMap::new();
    for r in records {
        let b = buckets
            .entry((r.member.as_str(), r.timestamp.hour()))
            .or_default();
        b.samples += 1;
        b.consumption += r.consumption_kwh;
        b.own_generation += r.own_generation_kwh;
        b.shared_generation += r.shared_generation_kwh;
        b.gains = b
            .gains
            .map(|p, acc| acc.accumulate(*r.gains.get(p), handling));
    }

    buckets
        .into_iter()
        .map(|((member, hour), b)| {
            let n = b.samples as f64;
            HourlyProfile {
                member: member.to_string(),
                hour,
                samples: b.samples,
                mean_consumption_kwh: b.consumption / n,
                mean_own_generation_kwh: b.own_generation / n,
                mean_shared_generation_kwh: b.shared_generation / n,
                gains: b.gains,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::batch::allocate_batch;
    use crate::community::tariff::Tariff;
    use crate::community::types::Reading;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid test timestamp")
    }

    fn records() -> Vec<AllocationRecord> {
        let mut readings = Vec::new();
        for day in 1..=2 {
            let wc = f64::from(day);
            readings.push(Reading::new("B", at(day, 12), wc, 4.0, 0.0));
            readings.push(Reading::new("A", at(day, 12), 3.0 * wc, 0.0, 1.0));
            readings.push(Reading::new("B", at(day, 20), 2.0, 0.0, 0.0));
            readings.push(Reading::new("A", at(day, 20), 1.0, 0.0, 0.0));
        }
        allocate_batch(&readings, &Tariff::default())
            .expect("membership is non-empty")
            .into_records()
    }

    #[test]
    fn buckets_are_sorted_and_averaged() {
        let p = hourly_profiles(&records(), UndefinedHandling::Propagate);
        let keys: Vec<(&str, u32)> = p.iter().map(|h| (h.member.as_str(), h.hour)).collect();
        assert_eq!(keys, [("A", 12), ("A", 20), ("B", 12), ("B", 20)]);

        let a_noon = &p[0];
        assert_eq!(a_noon.samples, 2);
        assert_eq!(a_noon.mean_consumption_kwh, 4.5);
        assert_eq!(a_noon.mean_shared_generation_kwh, 1.0);
        assert_eq!(p[2].mean_own_generation_kwh, 4.0);
    }

    #[test]
    fn gains_are_summed_not_averaged() {
        let recs = records();
        let p = hourly_profiles(&recs, UndefinedHandling::Propagate);
        let expected: Metric = recs
            .iter()
            .filter(|r| r.member == "A" && r.timestamp.hour() == 12)
            .map(|r| r.gains.eq)
            .sum();
        assert_eq!(p[0].gains.eq, expected);
    }

    #[test]
    fn night_generation_gain_is_undefined_unless_skipped() {
        let recs = records();
        let strict = hourly_profiles(&recs, UndefinedHandling::Propagate);
        assert!(strict[1].gains.generation.is_undefined());

        let lenient = hourly_profiles(&recs, UndefinedHandling::Skip);
        assert_eq!(lenient[1].gains.generation, Metric::Value(0.0));
    }
}
