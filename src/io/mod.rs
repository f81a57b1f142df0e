//! Dataset loading and CSV export.

pub mod export;
/// CSV reader for metered member readings.
pub mod readings;

pub use readings::{filter_window, load_readings, read_readings};
