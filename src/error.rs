//! Error types for the allocation engine and the dataset adapter.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::config::ConfigError;

/// Input-shape errors raised when a timestamp group cannot be allocated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    /// The declared membership has no members.
    #[error("membership is empty")]
    EmptyMembership,
    /// A timestamp group has no readings.
    #[error("timestamp group is empty")]
    EmptyGroup,
    /// A reading belongs to a member outside the declared membership.
    #[error("member `{member}` is not part of the declared membership")]
    UnknownMember { member: String },
    /// A member has more than one reading in the same group.
    #[error("member `{member}` has more than one reading at this timestamp")]
    DuplicateReading { member: String },
    /// Some declared members have no reading in the group.
    #[error("missing readings for {} member(s): {}", .missing.len(), .missing.join(", "))]
    MissingReadings { missing: Vec<String> },
    /// Readings in one group fall on different minutes.
    #[error("group mixes timestamps {first} and {other}")]
    MixedTimestamps {
        first: NaiveDateTime,
        other: NaiveDateTime,
    },
}

/// Errors raised while loading readings from a CSV dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The dataset file could not be opened.
    #[error("cannot read dataset `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The CSV layer failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// A configured column is absent from the header row.
    #[error("missing column `{0}` in dataset header")]
    MissingColumn(String),
    /// A timestamp cell could not be parsed.
    #[error("line {line}: invalid timestamp `{value}`")]
    Timestamp { line: u64, value: String },
    /// An energy cell is not a finite, non-negative number.
    #[error("line {line}: invalid {column} value `{value}` (expected a non-negative number)")]
    Energy {
        line: u64,
        column: String,
        value: String,
    },
    /// A member cell is blank.
    #[error("line {line}: empty member identifier")]
    EmptyMember { line: u64 },
}

/// Errors that stop a whole run before any report is produced.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The configuration failed validation.
    #[error("invalid configuration ({} error(s)): {}", .0.len(), join_errors(.0))]
    Config(Vec<ConfigError>),
    /// The dataset could not be loaded.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The run could not start allocating (e.g. no readings at all).
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(vec![e])
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
