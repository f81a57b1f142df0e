//! Value-share allocation for energy communities.
//!
//! Per timestamp, the community's collective saving against individual grid
//! settlement is split among members under five policies. Results are then
//! summed per member and reduced to community-level indices.

pub mod community;
pub mod config;
pub mod error;
pub mod io;
pub mod observability;
pub mod profiles;
pub mod runner;

#[cfg(feature = "api")]
pub mod api;
