//! Value-share allocation engine for an energy community.

/// Per-timestamp allocator for the five gain policies.
pub mod allocator;
/// Community net position and grid settlement.
pub mod balance;
/// Timestamp grouping, membership checks and batch runs.
pub mod batch;
pub mod indices;
/// Counterfactual marginal contribution of one member.
pub mod marginal;
pub mod metric;
pub mod profile;
pub mod summary;
/// Two-rate tariff model.
pub mod tariff;
pub mod types;

// Re-export the main types for convenience
pub use allocator::allocate_group;
pub use balance::CommunityPosition;
pub use batch::{BatchAllocator, BatchOutcome, Membership, RejectedGroup, allocate_batch};
pub use indices::CommunityIndices;
pub use metric::{Metric, UndefinedHandling};
pub use profile::{HourlyProfile, hourly_profiles};
pub use summary::{MemberSummary, summarize_members};
pub use tariff::Tariff;
pub use types::{AllocationRecord, GroupAllocation, Policy, PolicyValues, Reading};
