//! End-to-end run: readings in, allocation table, summaries and indices out.

use std::fmt;

use crate::community::{
    AllocationRecord, BatchAllocator, BatchOutcome, CommunityIndices, HourlyProfile, MemberSummary,
    Membership, Reading, Tariff, UndefinedHandling, hourly_profiles, summarize_members,
};
use crate::config::RunConfig;
use crate::error::RunError;
use crate::io::readings::{filter_window, load_readings};
use crate::profiles::synthetic_readings;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Tariff applied to every timestamp.
    pub tariff: Tariff,
    /// Handling used for undefined values in window sums.
    pub handling: UndefinedHandling,
    /// Allocated and rejected timestamp groups.
    pub outcome: BatchOutcome,
    /// Member summaries sorted by member.
    pub members: Vec<MemberSummary>,
    /// Window-level community indices.
    pub indices: CommunityIndices,
    /// Hour-of-day profiles per member.
    pub profiles: Vec<HourlyProfile>,
}

impl RunResult {
    /// Iterates the concatenated allocation table.
    pub fn records(&self) -> impl Iterator<Item = &AllocationRecord> {
        self.outcome.records()
    }
}

/// Loads the configured readings: the CSV dataset when a path is set,
/// otherwise the synthetic community. The observation window applies to both.
///
/// # Errors
///
/// Returns a `RunError` if the window, the dataset, or the synthetic
/// parameters are invalid.
pub fn load_configured_readings(cfg: &RunConfig) -> Result<Vec<Reading>, RunError> {
    let (start, end) = cfg.dataset.window()?;
    let readings = match &cfg.dataset.path {
        Some(path) => load_readings(path, &cfg.dataset)?,
        None => synthetic_readings(&cfg.synthetic)?,
    };
    let before = readings.len();
    let readings = filter_window(readings, start, end);
    if readings.len() != before {
        tracing::info!(
            kept = readings.len(),
            dropped = before - readings.len(),
            "observation window applied"
        );
    }
    Ok(readings)
}

/// Allocates `readings` and derives the summaries and indices.
///
/// The membership is the set of members present anywhere in `readings`.
///
/// # Errors
///
/// Returns [`RunError::Allocation`] if `readings` is empty.
pub fn allocate_readings(
    readings: &[Reading],
    tariff: Tariff,
    handling: UndefinedHandling,
) -> Result<RunResult, RunError> {
    let membership = Membership::from_readings(readings)?;
    let outcome = BatchAllocator::new(tariff, membership).run(readings);
    let members = summarize_members(outcome.records(), handling);
    let indices = CommunityIndices::from_summaries(&members, handling);
    let profiles = hourly_profiles(outcome.records(), handling);

    tracing::info!(
        members = members.len(),
        groups = outcome.groups.len(),
        rejected = outcome.rejected.len(),
        "allocation run finished"
    );

    Ok(RunResult {
        tariff,
        handling,
        outcome,
        members,
        indices,
        profiles,
    })
}

/// Validates `cfg`, loads its readings and allocates them.
///
/// # Errors
///
/// Returns [`RunError::Config`] with every violation when validation fails,
/// or any error of [`load_configured_readings`] and [`allocate_readings`].
pub fn run(cfg: &RunConfig) -> Result<RunResult, RunError> {
    let errors = cfg.validate();
    if !errors.is_empty() {
        return Err(RunError::Config(errors));
    }
    let handling = cfg.summary.handling()?;
    let readings = load_configured_readings(cfg)?;
    allocate_readings(&readings, cfg.tariff.tariff(), handling)
}

/// Text report: member summaries followed by community indices.
impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tariff: consumption {:.3}/kWh, feed-in {:.3}/kWh",
            self.tariff.consumption_price, self.tariff.feed_in_price
        )?;
        writeln!(
            f,
            "Timestamps: {} allocated, {} rejected",
            self.outcome.groups.len(),
            self.outcome.rejected.len()
        )?;
        for rejected in &self.outcome.rejected {
            writeln!(
                f,
                "  rejected {}: {}",
                rejected.timestamp.format("%Y-%m-%d %H:%M"),
                rejected.error
            )?;
        }
        writeln!(f, "\n--- Members ---")?;
        for m in &self.members {
            write!(f, "{m}")?;
        }
        write!(f, "\n{}", self.indices)
    }
}
