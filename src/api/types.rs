//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::community::{CommunityIndices, Tariff};

/// Community indices plus the run context they were computed under.
#[derive(Debug, Serialize)]
pub struct IndicesResponse {
    /// Tariff applied to every timestamp.
    pub tariff: Tariff,
    /// Number of timestamp groups allocated.
    pub groups: usize,
    /// Number of timestamp groups rejected by membership checks.
    pub rejected_groups: usize,
    /// Window-level community indices.
    pub indices: CommunityIndices,
}

/// Optional filters for the allocations endpoint.
///
/// `from` and `to` accept the same timestamp layouts as the dataset loader.
#[derive(Debug, Default, Deserialize)]
pub struct AllocationQuery {
    /// Only records of this member.
    pub member: Option<String>,
    /// Start timestamp (inclusive).
    pub from: Option<String>,
    /// End timestamp (inclusive).
    pub to: Option<String>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::UndefinedHandling;

    #[test]
    fn indices_response_serializes_undefined_as_text() {
        let resp = IndicesResponse {
            tariff: Tariff::default(),
            groups: 0,
            rejected_groups: 0,
            indices: CommunityIndices::from_summaries(&[], UndefinedHandling::Propagate),
        };
        let json = serde_json::to_value(&resp).expect("response serializes");
        assert_eq!(json["indices"]["cost_savings"], "n/a");
        assert_eq!(json["indices"]["fairness"]["G"], "n/a");
        assert_eq!(json["tariff"]["feed_in_price"], 0.5);
    }
}
