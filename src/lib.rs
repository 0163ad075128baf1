//! Post-processing of transient-search candidate archives: merging per-segment
//! archives, pulse-rate curves for pulsar calibration scans and screening
//! plots of candidates and image noise.

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod plot;
pub mod state;

pub use config::AnalysisConfig;
pub use error::{CandError, ColumnKind, Result};
