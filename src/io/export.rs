//! CSV export for allocation tables, member summaries and hourly profiles.
//!
//! Undefined cells are written as `undefined` and not-applicable cells as
//! `n/a`, never as zero.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::community::{
    AllocationRecord, HourlyProfile, MemberSummary, Metric, Policy, PolicyValues,
};

const DECIMALS: usize = 6;

fn num(v: f64) -> String {
    format!("{v:.DECIMALS$}")
}

fn metric(m: Metric) -> String {
    m.to_fixed(DECIMALS)
}

fn policy_columns(prefix: &str) -> impl Iterator<Item = String> + '_ {
    Policy::ALL
        .into_iter()
        .map(move |p| format!("{prefix}_{}", p.code()))
}

fn policy_cells(values: &PolicyValues<Metric>) -> impl Iterator<Item = String> + '_ {
    values.iter().map(|(_, m)| metric(*m))
}

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

/// Writes the allocation table to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_allocations(records: &[AllocationRecord], path: &Path) -> io::Result<()> {
    write_allocations(records, create(path)?)
}

/// Writes the allocation table as CSV to any writer.
///
/// One row per record, in table order. Column names follow the usual
/// notation: `Wdi`, `Payi_I`, `Gi_<policy>`, `Payi_<policy>`.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_allocations(records: &[AllocationRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = [
        "Member",
        "TIMESTAMP_R",
        "Wci",
        "Wgi",
        "Wgsi",
        "Wdi",
        "RevI",
        "CostI",
        "Payi_I",
        "DIcg",
        "TNetCmc",
        "MC",
        "DImc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(policy_columns("Gi"));
    header.extend(policy_columns("Payi"));
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![
            r.member.clone(),
            r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            num(r.consumption_kwh),
            num(r.own_generation_kwh),
            num(r.shared_generation_kwh),
            num(r.net_deficit_kwh),
            num(r.revenue),
            num(r.cost),
            num(r.payment),
            metric(r.cg_score),
            num(r.counterfactual_net_kwh),
            num(r.marginal_contribution),
            metric(r.mc_share),
        ];
        row.extend(policy_cells(&r.gains));
        row.extend(policy_cells(&r.payments));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes member summaries to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_members(members: &[MemberSummary], path: &Path) -> io::Result<()> {
    write_members(members, create(path)?)
}

/// Writes member summaries as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_members(members: &[MemberSummary], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = [
        "Member", "readings", "Wci", "Wgi", "Wgsi", "WgTi", "Wused_gi", "RevI", "CostI", "Payi_I",
        "MC", "SSIi", "SCIi",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(policy_columns("Gi"));
    header.extend(policy_columns("Payi"));
    header.extend(policy_columns("CSi"));
    header.extend(policy_columns("Xi"));
    wtr.write_record(&header)?;

    for m in members {
        let mut row = vec![
            m.member.clone(),
            m.readings.to_string(),
            num(m.consumption_kwh),
            num(m.own_generation_kwh),
            num(m.shared_generation_kwh),
            num(m.total_generation_kwh),
            num(m.self_consumed_kwh),
            num(m.revenue),
            num(m.cost),
            num(m.payment),
            num(m.marginal_contribution),
            metric(m.self_sufficiency),
            metric(m.self_consumption),
        ];
        row.extend(policy_cells(&m.gains));
        row.extend(policy_cells(&m.payments));
        row.extend(policy_cells(&m.cost_savings));
        row.extend(policy_cells(&m.gain_per_generation));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes hourly profiles to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_profiles(profiles: &[HourlyProfile], path: &Path) -> io::Result<()> {
    write_profiles(profiles, create(path)?)
}

/// Writes hourly profiles as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_profiles(profiles: &[HourlyProfile], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = [
        "Member",
        "Hour",
        "samples",
        "Wci_mean",
        "Wgi_mean",
        "Wgsi_mean",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(policy_columns("Gi"));
    wtr.write_record(&header)?;

    for p in profiles {
        let mut row = vec![
            p.member.clone(),
            p.hour.to_string(),
            p.samples.to_string(),
            num(p.mean_consumption_kwh),
            num(p.mean_own_generation_kwh),
            num(p.mean_shared_generation_kwh),
        ];
        row.extend(policy_cells(&p.gains));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
