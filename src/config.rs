use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::psrrates::{DurationMode, RateCurveOptions};

/// Tunable analysis parameters. Every field has a default, so a config file
/// only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Feature holding the detection SNR.
    pub snr_column: String,
    /// Sky offset features (radians).
    pub l_column: String,
    pub m_column: String,
    /// Flux proxy features, most preferred first.
    pub flux_columns: Vec<String>,
    /// Pulsar period (s).
    pub period: f64,
    /// Points in the pulse-rate grid.
    pub nbins: usize,
    /// Edges of the noise histograms.
    pub noise_hist_edges: usize,
    /// Per-second counts above `median + high_count_sigma·std` are reported.
    pub high_count_sigma: f64,
    /// Exponent of the SNR marker-size scaling.
    pub snr_size_exponent: i32,
    /// Convert rates to counts for every offset scan with the duration of
    /// scan 1, as older analyses did.
    pub legacy_offset_duration: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            snr_column: "snr1".into(),
            l_column: "l1".into(),
            m_column: "m1".into(),
            flux_columns: vec!["immax2".into(), "immax1".into(), "snr1".into()],
            period: 0.156,
            nbins: 60,
            noise_hist_edges: 50,
            high_count_sigma: 20.0,
            snr_size_exponent: 5,
            legacy_offset_duration: false,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, or the contents of `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn rate_curve_options(&self) -> RateCurveOptions {
        RateCurveOptions {
            nbins: self.nbins,
            period: self.period,
            flux_columns: self.flux_columns.clone(),
            duration_mode: if self.legacy_offset_duration {
                DurationMode::SecondScan
            } else {
                DurationMode::PerScan
            },
        }
    }
}
