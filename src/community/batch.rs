//! Batch allocation over every timestamp of a dataset.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::error::AllocationError;

use super::allocator::allocate_group;
use super::tariff::Tariff;
use super::types::{AllocationRecord, GroupAllocation, Reading, truncate_to_minute};

/// The declared member set of a community, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    members: Vec<String>,
}

impl Membership {
    /// Declares a membership from a list of identifiers.
    ///
    /// Repeated identifiers are collapsed onto their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::EmptyMembership`] if no member is given.
    pub fn new<I, S>(members: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let members: Vec<String> = members
            .into_iter()
            .map(Into::into)
            .filter(|m| seen.insert(m.clone()))
            .collect();
        if members.is_empty() {
            return Err(AllocationError::EmptyMembership);
        }
        Ok(Self { members })
    }

    /// Derives the membership from the distinct members of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::EmptyMembership`] for an empty dataset.
    pub fn from_readings(readings: &[Reading]) -> Result<Self, AllocationError> {
        Self::new(readings.iter().map(|r| r.member.as_str()))
    }

    /// Number of members `N`.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; a membership cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if `member` belongs to the community.
    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    /// Member identifiers in declaration order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Checks that a group holds exactly one reading for every member.
    ///
    /// # Errors
    ///
    /// Returns the first shape violation found: an unknown member, a
    /// duplicate reading, or the list of members without a reading.
    pub fn check_group(&self, readings: &[Reading]) -> Result<(), AllocationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(readings.len());
        for r in readings {
            if !self.contains(&r.member) {
                return Err(AllocationError::UnknownMember {
                    member: r.member.clone(),
                });
            }
            if !seen.insert(r.member.as_str()) {
                return Err(AllocationError::DuplicateReading {
                    member: r.member.clone(),
                });
            }
        }
        let missing: Vec<String> = self
            .members
            .iter()
            .filter(|m| !seen.contains(m.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(AllocationError::MissingReadings { missing });
        }
        Ok(())
    }
}

/// All readings sharing one timestamp (minute granularity).
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampGroup {
    /// Timestamp truncated to the minute.
    pub timestamp: NaiveDateTime,
    /// Readings in input order.
    pub readings: Vec<Reading>,
}

/// Splits readings into timestamp groups.
///
/// Groups are returned in order of first appearance of their timestamp;
/// readings keep their input order inside each group.
pub fn group_by_timestamp(readings: &[Reading]) -> Vec<TimestampGroup> {
    let mut index: HashMap<NaiveDateTime, usize> = HashMap::new();
    let mut groups: Vec<TimestampGroup> = Vec::new();

    for r in readings {
        let key = truncate_to_minute(r.timestamp);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(TimestampGroup {
                timestamp: key,
                readings: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].readings.push(r.clone());
    }
    groups
}

/// A timestamp group that could not be allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedGroup {
    /// Timestamp of the rejected group.
    pub timestamp: NaiveDateTime,
    /// Number of readings the group held.
    pub readings: usize,
    /// Why the group was rejected.
    pub error: AllocationError,
}

/// Result of a batch run: allocated groups plus rejected ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Allocated groups in order of first appearance.
    pub groups: Vec<GroupAllocation>,
    /// Groups that failed membership or shape checks.
    pub rejected: Vec<RejectedGroup>,
}

impl BatchOutcome {
    /// Iterates the concatenated allocation table.
    pub fn records(&self) -> impl Iterator<Item = &AllocationRecord> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    /// Consumes the outcome into the concatenated allocation table.
    pub fn into_records(self) -> Vec<AllocationRecord> {
        self.groups.into_iter().flat_map(|g| g.records).collect()
    }

    /// Number of distinct timestamps visited, allocated or not.
    pub fn timestamps_visited(&self) -> usize {
        self.groups.len() + self.rejected.len()
    }

    fn push(
        mut self,
        timestamp: NaiveDateTime,
        readings: usize,
        result: Result<GroupAllocation, AllocationError>,
    ) -> Self {
        match result {
            Ok(group) => self.groups.push(group),
            Err(error) => self.rejected.push(RejectedGroup {
                timestamp,
                readings,
                error,
            }),
        }
        self
    }
}

/// Runs the per-timestamp allocator over a whole dataset.
///
/// Each group is checked against the declared membership before it is
/// allocated. A rejected group is recorded and skipped; it never aborts
/// the remaining groups.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDateTime;
/// use ec_value_share::community::batch::{BatchAllocator, Membership};
/// use ec_value_share::community::tariff::Tariff;
/// use ec_value_share::community::types::Reading;
///
/// let t = NaiveDateTime::default();
/// let readings = vec![
///     Reading::new("A", t, 10.0, 0.0, 0.0),
///     Reading::new("B", t, 0.0, 8.0, 0.0),
/// ];
/// let membership = Membership::from_readings(&readings).unwrap_or_else(|e| panic!("{e}"));
/// let outcome = BatchAllocator::new(Tariff::new(1.0, 0.5), membership).run(&readings);
/// assert_eq!(outcome.records().count(), 2);
/// assert!(outcome.rejected.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BatchAllocator {
    tariff: Tariff,
    membership: Membership,
}

impl BatchAllocator {
    /// Creates a batch allocator for a fixed tariff and membership.
    pub fn new(tariff: Tariff, membership: Membership) -> Self {
        Self { tariff, membership }
    }

    /// Returns the tariff.
    pub fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    /// Validates and allocates one group.
    ///
    /// # Errors
    ///
    /// Returns an [`AllocationError`] if the group does not match the
    /// membership or is malformed.
    pub fn allocate(&self, group: &TimestampGroup) -> Result<GroupAllocation, AllocationError> {
        self.membership.check_group(&group.readings)?;
        allocate_group(&group.readings, &self.tariff)
    }

    /// Allocates every timestamp group of `readings`.
    pub fn run(&self, readings: &[Reading]) -> BatchOutcome {
        let groups = group_by_timestamp(readings);

        #[cfg(feature = "parallel")]
        let results: Vec<_> = groups.par_iter().map(|g| self.allocate(g)).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = groups.iter().map(|g| self.allocate(g)).collect();

        let outcome = groups
            .iter()
            .zip(results)
            .fold(BatchOutcome::default(), |acc, (g, result)| {
                acc.push(g.timestamp, g.readings.len(), result)
            });

        for rejected in &outcome.rejected {
            tracing::warn!(
                timestamp = %rejected.timestamp,
                readings = rejected.readings,
                error = %rejected.error,
                "timestamp group rejected"
            );
        }
        tracing::debug!(
            groups = outcome.groups.len(),
            rejected = outcome.rejected.len(),
            "batch allocation finished"
        );

        outcome
    }
}

/// Allocates a dataset using the membership found in the dataset itself.
///
/// # Errors
///
/// Returns [`AllocationError::EmptyMembership`] when `readings` is empty.
pub fn allocate_batch(
    readings: &[Reading],
    tariff: &Tariff,
) -> Result<BatchOutcome, AllocationError> {
    let membership = Membership::from_readings(readings)?;
    Ok(BatchAllocator::new(*tariff, membership).run(readings))
}
