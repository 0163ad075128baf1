//! Cumulative pulse-rate versus flux curves for a pulsar observed on-axis and
//! at increasing offsets from the phase center.
//!
//! Each scan is reduced to one flux sample per pulsar rotation (the brightest
//! detection inside each period-wide window). Sorting those samples gives the
//! order statistics: the k-th brightest sample is the flux above which exactly
//! k pulses were seen, i.e. a rate of k / duration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{info, warn};

use super::time::absolute_times;
use crate::data::loader::{read_candidates, read_state};
use crate::error::{CandError, Result};

/// Which duration turns a rate into a pulse count for the offset scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationMode {
    /// Every scan uses its own duration.
    #[default]
    PerScan,
    /// Scans 1.. all use the duration of scan 1. Reproduces curves made by
    /// older versions of the analysis.
    SecondScan,
}

#[derive(Debug, Clone)]
pub struct RateCurveOptions {
    /// Points in the rate grid.
    pub nbins: usize,
    /// Pulsar period (s).
    pub period: f64,
    /// Flux proxy feature names in priority order.
    pub flux_columns: Vec<String>,
    pub duration_mode: DurationMode,
}

impl Default for RateCurveOptions {
    fn default() -> Self {
        Self {
            nbins: 60,
            period: 0.156,
            flux_columns: vec!["immax2".into(), "immax1".into(), "snr1".into()],
            duration_mode: DurationMode::PerScan,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-scan pulses
// ---------------------------------------------------------------------------

/// One flux sample per pulse, ascending, and the time span of the detections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPulses {
    pub maxima: Vec<f64>,
    pub duration: f64,
}

impl ScanPulses {
    pub fn from_detections(times: &[f64], flux: &[f64], period: f64) -> Self {
        let duration = match (min(times), max(times)) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        };
        Self {
            maxima: window_maxima(times, flux, period),
            duration,
        }
    }

    pub fn len(&self) -> usize {
        self.maxima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty()
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Brightest flux inside each occupied window, sorted ascending.
///
/// Windows are half-open, one `period` wide and centered on
/// `t_min + i·period`, so the first spans `[t_min − period/2, t_min + period/2)`.
/// Empty windows contribute nothing.
pub fn window_maxima(times: &[f64], flux: &[f64], period: f64) -> Vec<f64> {
    let Some(t0) = min(times) else {
        return Vec::new();
    };

    let mut peaks: BTreeMap<i64, f64> = BTreeMap::new();
    for (&t, &f) in times.iter().zip(flux) {
        let window = ((t - t0 + period / 2.0) / period).floor() as i64;
        peaks
            .entry(window)
            .and_modify(|peak| *peak = peak.max(f))
            .or_insert(f);
    }

    let mut maxima: Vec<f64> = peaks.into_values().collect();
    maxima.sort_by(f64::total_cmp);
    maxima
}

// ---------------------------------------------------------------------------
// Rate curves
// ---------------------------------------------------------------------------

/// Aligned (rate, flux threshold) points, ascending in rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateCurve {
    pub rates: Vec<f64>,
    pub fluxes: Vec<f64>,
}

impl RateCurve {
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rates.iter().copied().zip(self.fluxes.iter().copied())
    }

    fn push(&mut self, rate: f64, flux: f64) {
        self.rates.push(rate);
        self.fluxes.push(flux);
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}

/// Rates from one pulse to every pulse of the reference scan over its duration.
/// Empty when the reference has no usable duration.
pub fn rate_grid(reference: &ScanPulses, nbins: usize) -> Vec<f64> {
    if reference.is_empty() || reference.duration <= 0.0 {
        return Vec::new();
    }
    linspace(
        1.0 / reference.duration,
        reference.len() as f64 / reference.duration,
        nbins,
    )
}

/// Invert the order statistics of `maxima` (ascending) at each rate.
///
/// A rate `r` asks for `k = round(r · duration)` pulses; when `0 < k ≤ n` the
/// threshold is the k-th brightest sample. Other rates yield no point.
pub fn curve_points(rates: &[f64], maxima: &[f64], duration: f64) -> RateCurve {
    let mut curve = RateCurve::default();
    for &rate in rates {
        let k = (rate * duration).round_ties_even();
        if k >= 1.0 && k <= maxima.len() as f64 {
            curve.push(rate, maxima[maxima.len() - k as usize]);
        }
    }
    curve
}

/// Curves for every scan on the rate grid of scan 0.
pub fn build_rate_curves(
    scans: &[ScanPulses],
    nbins: usize,
    mode: DurationMode,
) -> BTreeMap<usize, RateCurve> {
    let Some(reference) = scans.first() else {
        return BTreeMap::new();
    };
    let rates = rate_grid(reference, nbins);
    if rates.is_empty() {
        warn!("Reference scan has no duration; rate curves are empty.");
    }

    scans
        .iter()
        .enumerate()
        .map(|(i, scan)| {
            let duration = match mode {
                DurationMode::SecondScan if i >= 1 => scans[1].duration,
                _ => scan.duration,
            };
            (i, curve_points(&rates, &scan.maxima, duration))
        })
        .collect()
}

/// Result of [`make_psrrates`].
#[derive(Debug, Clone)]
pub struct RateCurves {
    /// Feature used as flux proxy.
    pub flux_column: String,
    pub scans: Vec<ScanPulses>,
    /// Scan index (0 = on-axis) → curve.
    pub curves: BTreeMap<usize, RateCurve>,
}

/// Load `paths` (on-axis scan first, then increasing offsets) and build their
/// pulse-rate curves.
pub fn make_psrrates(paths: &[PathBuf], options: &RateCurveOptions) -> Result<RateCurves> {
    let first = paths
        .first()
        .ok_or_else(|| CandError::InvalidParameter("no scans given".into()))?;
    if !(options.period > 0.0 && options.period.is_finite()) {
        return Err(CandError::InvalidParameter(format!(
            "period must be positive, got {}",
            options.period
        )));
    }
    if options.nbins == 0 {
        return Err(CandError::InvalidParameter("nbins must be at least 1".into()));
    }

    let state = read_state(first)?;
    let flux = state.features.first_of(&options.flux_columns)?;
    if options.flux_columns.last() == Some(&flux.name) && options.flux_columns.len() > 1 {
        warn!("Using {} for flux.", flux.name);
    } else {
        info!("Using {} for flux.", flux.name);
    }
    if options.duration_mode == DurationMode::SecondScan {
        warn!("Offset scans use the duration of scan 1 to convert rates to counts.");
    }

    let mut scans = Vec::with_capacity(paths.len());
    for path in paths {
        let archive = read_candidates(path)?;
        if archive.state.features.names().get(flux.index) != Some(&flux.name) {
            return Err(CandError::SchemaMismatch {
                path: path.clone(),
                reason: format!("feature {} is not '{}'", flux.index, flux.name),
            });
        }

        let times = absolute_times(&archive.state, &archive.candidates.locations)?;
        let fluxes = archive.candidates.feature_column(flux.index);
        let pulses = ScanPulses::from_detections(&times, &fluxes, options.period);
        info!("Found {} unique pulses.", pulses.len());
        scans.push(pulses);
    }

    let curves = build_rate_curves(&scans, options.nbins, options.duration_mode);
    Ok(RateCurves {
        flux_column: flux.name,
        scans,
        curves,
    })
}

// ---------------------------------------------------------------------------
// Flux ratios against the on-axis scan
// ---------------------------------------------------------------------------

/// Flux of `curve` over the reference flux at the same rate.
pub fn flux_ratios(reference: &RateCurve, curve: &RateCurve) -> RateCurve {
    let mut ratios = RateCurve::default();
    for (rate, flux) in curve.points() {
        if let Some(j) = reference.rates.iter().position(|&r| r == rate) {
            ratios.push(rate, flux / reference.fluxes[j]);
        }
    }
    ratios
}

/// Representative flux ratio of every offset scan.
///
/// All ratios are read at the last index of the furthest scan's ratio curve,
/// which avoids both the low-count end and the rates where the on-axis pulsar
/// saturates at one pulse per period.
pub fn typical_ratios(curves: &BTreeMap<usize, RateCurve>) -> Vec<(usize, f64)> {
    let Some(reference) = curves.get(&0) else {
        return Vec::new();
    };
    let ratios: Vec<(usize, RateCurve)> = curves
        .iter()
        .filter(|(&k, _)| k > 0)
        .map(|(&k, curve)| (k, flux_ratios(reference, curve)))
        .collect();

    let n = match ratios.last() {
        Some((_, last)) if !last.is_empty() => last.len(),
        _ => return Vec::new(),
    };
    ratios
        .iter()
        .filter_map(|(k, r)| r.fluxes.get(n - 1).map(|&v| (*k, v)))
        .collect()
}
