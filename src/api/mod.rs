//! Read-only REST API over a completed allocation run.
//!
//! Provides three GET endpoints:
//! - `/indices` community indices and run context
//! - `/members` per-member window summaries
//! - `/allocations` the allocation table with optional member and time filters

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::community::{AllocationRecord, CommunityIndices, MemberSummary, Tariff};

pub use types::{AllocationQuery, ErrorResponse, IndicesResponse};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the allocation run completes and wrapped in
/// `Arc`; all data is read-only, so no locks are needed.
pub struct AppState {
    /// Tariff used for the run.
    pub tariff: Tariff,
    /// Number of allocated timestamp groups.
    pub groups: usize,
    /// Number of rejected timestamp groups.
    pub rejected_groups: usize,
    /// Window-level community indices.
    pub indices: CommunityIndices,
    /// Member summaries sorted by member.
    pub members: Vec<MemberSummary>,
    /// Concatenated allocation table.
    pub records: Vec<AllocationRecord>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/indices", get(handlers::get_indices))
        .route("/members", get(handlers::get_members))
        .route("/allocations", get(handlers::get_allocations))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
