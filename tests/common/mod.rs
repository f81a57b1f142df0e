//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ec_value_share::community::{Reading, Tariff};

/// Float tolerance for gain and payment comparisons.
pub const EPS: f64 = 1e-9;

/// Timestamp on 2021-01-01 at `hour:minute`.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}

/// Reference tariff (consumption 1.0, feed-in 0.5).
pub fn reference_tariff() -> Tariff {
    Tariff::new(1.0, 0.5)
}

/// Two-member reference group: A consumes 10 kWh, B generates 8 kWh.
pub fn reference_group() -> Vec<Reading> {
    vec![
        Reading::new("A", at(12, 0), 10.0, 0.0, 0.0),
        Reading::new("B", at(12, 0), 0.0, 8.0, 0.0),
    ]
}

/// Four members with mixed surpluses and deficits, shared generation included.
pub fn mixed_group(hour: u32) -> Vec<Reading> {
    let t = at(hour, 0);
    vec![
        Reading::new("A", t, 4.0, 0.0, 0.5),
        Reading::new("B", t, 1.0, 3.5, 0.5),
        Reading::new("C", t, 2.5, 1.0, 0.5),
        Reading::new("D", t, 0.5, 2.0, 0.5),
    ]
}

/// A day of hourly readings for the four mixed members.
pub fn mixed_day() -> Vec<Reading> {
    (0..24)
        .flat_map(|h| {
            mixed_group(h).into_iter().map(move |r| {
                // no generation at night
                if (6..18).contains(&h) {
                    r
                } else {
                    Reading::new(r.member, r.timestamp, r.consumption_kwh, 0.0, 0.0)
                }
            })
        })
        .collect()
}

/// Small CSV dataset over two days with an extra ignored column.
pub const SAMPLE_CSV: &str = "\
Member,TIMESTAMP_R,Wci,Wgi,Wgsi,note
A,2021-01-01 11:00:00,3.0,0.0,0.5,
B,2021-01-01 11:00:00,0.5,4.0,0.5,pv
A,2021-01-01 12:00:00,2.0,0.0,0.5,
B,2021-01-01 12:00:00,0.5,5.0,0.5,pv
A,2021-01-02 12:00:00,2.5,0.0,0.0,
B,2021-01-02 12:00:00,1.0,3.0,0.0,pv
";

/// Unique path in the system temp directory for file-based tests.
pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ec-value-share-{}-{name}", std::process::id()))
}
