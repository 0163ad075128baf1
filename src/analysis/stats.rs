use log::info;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::filter::{dt_indices, select, unique_dts};
use crate::data::model::ArchiveState;
use crate::error::{CandError, Result};

// ---------------------------------------------------------------------------
// Elementary statistics
// ---------------------------------------------------------------------------

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

/// Marker areas that exaggerate SNR differences: `(snr − 0.9·min)^exponent`.
pub fn marker_sizes(snrs: &[f64], exponent: i32) -> Vec<f64> {
    let Some(min) = snrs.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let floor = 0.9 * min;
    snrs.iter().map(|s| (s - floor).powi(exponent)).collect()
}

// ---------------------------------------------------------------------------
// Candidate counts per second
// ---------------------------------------------------------------------------

/// Candidates per whole second for one dt trial.
#[derive(Debug, Clone, PartialEq)]
pub struct DtCounts {
    pub dtind: i64,
    /// Time-averaging factor `dtarr[dtind]`, when the metadata has it.
    pub dt: Option<f64>,
    /// Second of the first bin.
    pub start: i64,
    pub counts: Vec<usize>,
    /// Bin offsets (from `start`) whose count is anomalously high.
    pub high: Vec<usize>,
}

/// Time-averaging factor of dt trial `dtind`.
pub fn dt_factor(dtarr: &[f64], dtind: i64) -> Option<f64> {
    usize::try_from(dtind).ok().and_then(|i| dtarr.get(i)).copied()
}

/// Legend text of a dt trial: the factor when known, else the index.
pub fn dt_label(dtarr: &[f64], dtind: i64) -> String {
    match dt_factor(dtarr, dtind) {
        Some(dt) => format!("dt={dt}"),
        None => format!("dtind={dtind}"),
    }
}

/// Count candidates per second for every dt trial present, flagging bins with
/// `count > median + sigma·std`. Big clusters often trace RFI.
pub fn dm_counts(times: &[f64], dts: &[i64], dtarr: &[f64], sigma: f64) -> Vec<DtCounts> {
    unique_dts(dts)
        .into_iter()
        .filter_map(|dtind| {
            let good = dt_indices(dts, dtind);
            let seconds: Vec<i64> = select(times, &good)
                .iter()
                .map(|t| t.round_ties_even() as i64)
                .collect();
            let start = *seconds.iter().min()?;
            let end = *seconds.iter().max()?;

            let mut counts = vec![0usize; (end - start) as usize + 1];
            for s in &seconds {
                counts[(s - start) as usize] += 1;
            }

            let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
            let threshold = median(&as_f64)? + sigma * std_dev(&as_f64)?;
            let high: Vec<usize> = as_f64
                .iter()
                .enumerate()
                .filter(|(_, &c)| c > threshold)
                .map(|(i, _)| i)
                .collect();
            for &i in &high {
                info!("{} candidates for {} at {i} s", counts[i], dt_label(dtarr, dtind));
            }

            Some(DtCounts {
                dtind,
                dt: dt_factor(dtarr, dtind),
                start,
                counts,
                high,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normal quantiles
// ---------------------------------------------------------------------------

/// Observed SNRs paired with the SNR expected at the same rank for a purely
/// Gaussian search of `ntrials` independent trials.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalQuantiles {
    pub ntrials: f64,
    /// (snr, expected) for positive SNRs, brightest first.
    pub positive: Vec<(f64, f64)>,
    /// (|snr|, expected) for negative SNRs, brightest first.
    pub negative: Vec<(f64, f64)>,
}

/// Independent trials of an image search:
/// `npix · nints · ndm · Σ 1/dt` (every dt trial searched at every DM).
pub fn search_trials(state: &ArchiveState) -> Result<f64> {
    let dtfactor: f64 = state.dtarr.iter().map(|dt| 1.0 / dt).sum();
    Ok(state.npix()? * state.searched_ints()? * state.dmarr.len() as f64 * dtfactor)
}

/// Expected SNR of the `rank`-th (1-based) most significant of `ntrials`
/// Gaussian draws, or `None` when the rank exceeds the trials.
pub fn expected_snr(normal: &Normal, ntrials: f64, rank: usize) -> Option<f64> {
    let quantile = (ntrials + 0.5 - rank as f64) / ntrials;
    (quantile > 0.0 && quantile < 1.0).then(|| normal.inverse_cdf(quantile))
}

pub fn normal_quantiles(snrs: &[f64], ntrials: f64) -> Result<NormalQuantiles> {
    if !(ntrials > 0.0) {
        return Err(CandError::InvalidParameter(format!(
            "number of trials must be positive, got {ntrials}"
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| CandError::InvalidParameter(format!("standard normal: {e}")))?;

    let ranked = |mut values: Vec<f64>| -> Vec<(f64, f64)> {
        values.sort_by(|a, b| b.total_cmp(a));
        values
            .into_iter()
            .enumerate()
            .filter_map(|(j, snr)| expected_snr(&normal, ntrials, j + 1).map(|z| (snr, z)))
            .collect()
    };

    Ok(NormalQuantiles {
        ntrials,
        positive: ranked(snrs.iter().copied().filter(|&s| s > 0.0).collect()),
        negative: ranked(snrs.iter().filter(|&&s| s < 0.0).map(|s| s.abs()).collect()),
    })
}

// ---------------------------------------------------------------------------
// Sky offsets
// ---------------------------------------------------------------------------

/// Radians to arcminutes.
pub fn arcmin(radians: f64) -> f64 {
    60.0 * radians.to_degrees()
}

/// Field of view (arcmin) of an image with uv cell size `uvres` (wavelengths).
pub fn field_of_view(uvres: f64) -> f64 {
    arcmin(1.0 / uvres)
}

// ---------------------------------------------------------------------------
// Noise histograms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseHistogram {
    /// Bin edges, one more than bins.
    pub edges: Vec<f64>,
    /// Counts per input file.
    pub per_file: Vec<Vec<usize>>,
    /// Fraction of all samples at or above each bin.
    pub cumulative_fraction: Vec<f64>,
}

/// Histogram every file's samples on `nedges` shared edges spanning the global
/// range. The last bin includes its right edge.
pub fn noise_histogram(noises: &[Vec<f64>], nedges: usize) -> Result<NoiseHistogram> {
    if nedges < 2 {
        return Err(CandError::InvalidParameter(format!(
            "need at least 2 histogram edges, got {nedges}"
        )));
    }
    let all = noises.iter().flatten().copied();
    let lo = all.clone().reduce(f64::min);
    let hi = all.reduce(f64::max);
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return Ok(NoiseHistogram {
            edges: Vec::new(),
            per_file: vec![Vec::new(); noises.len()],
            cumulative_fraction: Vec::new(),
        });
    };

    let edges = super::psrrates::linspace(lo, hi, nedges);
    let nbins = nedges - 1;
    let width = (hi - lo) / nbins as f64;
    let bin_of = |v: f64| -> usize {
        if width <= 0.0 {
            return 0;
        }
        (((v - lo) / width).floor() as usize).min(nbins - 1)
    };

    let per_file: Vec<Vec<usize>> = noises
        .iter()
        .map(|samples| {
            let mut counts = vec![0usize; nbins];
            for &v in samples {
                counts[bin_of(v)] += 1;
            }
            counts
        })
        .collect();

    let mut totals = vec![0usize; nbins];
    for counts in &per_file {
        for (t, c) in totals.iter_mut().zip(counts) {
            *t += c;
        }
    }
    let grand: usize = totals.iter().sum();
    let mut cumulative_fraction = vec![0.0; nbins];
    let mut running = 0usize;
    for i in (0..nbins).rev() {
        running += totals[i];
        cumulative_fraction[i] = running as f64 / grand as f64;
    }

    Ok(NoiseHistogram {
        edges,
        per_file,
        cumulative_fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_and_std() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
    }

    #[test]
    fn test_marker_sizes() {
        let sizes = marker_sizes(&[10.0, 11.0], 2);
        assert!((sizes[0] - 1.0).abs() < 1e-12);
        assert!((sizes[1] - 4.0).abs() < 1e-12);
        assert!(marker_sizes(&[], 5).is_empty());
    }

    #[test]
    fn test_dm_counts_flags_spike() {
        // dt 0: one candidate per second for 30 s, plus 40 extra at t=10
        let mut times: Vec<f64> = (0..30).map(|s| 100.0 + s as f64).collect();
        times.extend(std::iter::repeat(110.2).take(40));
        let mut dts = vec![0i64; times.len()];
        // dt 1: two candidates
        times.extend([100.4, 101.6]);
        dts.extend([1, 1]);

        let counts = dm_counts(&times, &dts, &[1.0, 2.0], 3.0);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].dt, Some(1.0));
        assert_eq!(counts[1].dt, Some(2.0));
        assert_eq!(counts[0].start, 100);
        assert_eq!(counts[0].counts.len(), 30);
        assert_eq!(counts[0].counts[10], 41);
        assert_eq!(counts[0].high, vec![10]);
        assert_eq!(counts[1].dtind, 1);
        assert_eq!(counts[1].counts, vec![1, 0, 1]);
        assert!(counts[1].high.is_empty());
    }

    #[test]
    fn test_dt_label_prefers_factor() {
        assert_eq!(dt_label(&[1.0, 2.0, 4.0], 2), "dt=4");
        assert_eq!(dt_label(&[1.0], 3), "dtind=3");
        assert_eq!(dt_label(&[1.0], -1), "dtind=-1");
    }

    #[test]
    fn test_normal_quantiles() {
        let q = normal_quantiles(&[5.0, -4.0, 6.0, 0.0], 1000.0).unwrap();
        assert_eq!(q.positive.len(), 2);
        assert_eq!(q.positive[0].0, 6.0);
        assert_eq!(q.negative, vec![(4.0, q.positive[0].1)]);
        // rank 1 of 1000: quantile 0.9995 → about 3.29 sigma
        assert!((q.positive[0].1 - 3.2905).abs() < 1e-3);
        assert!(q.positive[1].1 < q.positive[0].1);
        assert!(normal_quantiles(&[1.0], 0.0).is_err());
    }

    #[test]
    fn test_expected_snr_out_of_range() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        assert!(expected_snr(&normal, 2.0, 3).is_none());
        assert!(expected_snr(&normal, 2.0, 1).is_some());
    }

    #[test]
    fn test_field_of_view() {
        let fov = field_of_view(1.0 / std::f64::consts::PI);
        assert!((fov - 10800.0).abs() < 1e-9);
    }

    #[test]
    fn test_noise_histogram() {
        let noises = vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0]];
        let hist = noise_histogram(&noises, 3).unwrap();
        assert_eq!(hist.edges, vec![0.0, 2.0, 4.0]);
        assert_eq!(hist.per_file, vec![vec![2, 1], vec![0, 2]]);
        assert_eq!(hist.cumulative_fraction, vec![1.0, 0.6]);

        let empty = noise_histogram(&[vec![]], 50).unwrap();
        assert!(empty.edges.is_empty());
        assert!(noise_histogram(&noises, 1).is_err());
    }
}
