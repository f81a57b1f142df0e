//! Seeded synthetic profiles used when no metered dataset is configured.

/// Community-wide synthetic reading generator.
pub mod community;
/// Household consumption profile.
pub mod consumption;
/// PV generation profile.
pub mod generation;
pub mod types;

pub use community::synthetic_readings;
pub use consumption::ConsumptionProfile;
pub use generation::PvProfile;
pub use types::EnergyProfile;
