//! PNG renderers. Each function takes fully computed arrays and writes one
//! image; no state is shared between calls.
//!
//! The `plot_*` entry points tie loading, analysis and rendering together the
//! way the command line uses them.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::analysis::psrrates::{make_psrrates, typical_ratios, RateCurves};
use crate::analysis::stats::{dm_counts, field_of_view, noise_histogram, normal_quantiles, search_trials};
use crate::config::AnalysisConfig;
use crate::data::filter::{kept_image_noise, scan_number, NoiseRemoval};
use crate::data::loader::read_noise;
use crate::data::merge::file_root;
use crate::state::CandidateSet;

pub mod cands;
pub mod noise;
pub mod rates;

/// Default output root for plots derived from `path`: `plot_<file root>`.
pub fn default_outroot(path: &Path) -> String {
    format!("plot_{}", file_root(path))
}

/// `(min, max)` of `values`.
pub(crate) fn span(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Axis range around `(lo, hi)` with a small margin; never zero-width.
pub(crate) fn padded((lo, hi): (f64, f64)) -> Range<f64> {
    let margin = if hi > lo { 0.02 * (hi - lo) } else { 0.5 };
    (lo - margin)..(hi + margin)
}

/// Marker radius (px) for a matplotlib-style marker area.
pub(crate) fn marker_radius(area: f64) -> i32 {
    (area.sqrt() / 2.0).clamp(1.0, 30.0) as i32
}

/// Render the screening plots of `paths`: DM-time, counts, normal quantiles
/// and sky offsets. Returns the files written.
pub fn plot_cands(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    outdir: Option<&Path>,
    outroot: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let compiled = CandidateSet::compile(paths, config)?;
    let first = &paths[0];
    let outroot = outroot.map(str::to_string).unwrap_or_else(|| default_outroot(first));
    let outdir = outdir
        .map(Path::to_path_buf)
        .or_else(|| compiled.state.existing_workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| first.parent().unwrap_or_else(|| Path::new("")).to_path_buf());
    let out = |suffix: &str| outdir.join(format!("{outroot}_{suffix}.png"));

    let all = &compiled.cands;
    if all.is_empty() {
        warn!("No candidates in {} archives; nothing to plot.", paths.len());
        return Ok(Vec::new());
    }
    let pos = all.positive();
    let mut written = Vec::new();

    if pos.is_empty() {
        warn!("No positive-SNR candidates; skipping DM-time plot.");
    } else {
        info!("Plotting DM-time distribution...");
        let path = out("dmt");
        cands::plot_dmt(&path, &pos, &compiled.state.dtarr, config.snr_size_exponent)?;
        written.push(path);
    }

    info!("Plotting DM count distribution...");
    let counts = dm_counts(&all.times, &all.dts, &compiled.state.dtarr, config.high_count_sigma);
    let path = out("dmcount");
    cands::plot_dmcount(&path, &counts)?;
    written.push(path);

    match search_trials(&compiled.state) {
        Ok(ntrials) => {
            info!("Plotting normal probability distribution...");
            let quantiles = normal_quantiles(&all.snrs, ntrials)?;
            let path = out("normprob");
            cands::plot_normprob(&path, &quantiles)?;
            written.push(path);
        }
        Err(e) => warn!("Skipping normal probability plot: {e}"),
    }

    match (pos.has_offsets(), compiled.state.uvres()) {
        (false, _) => {}
        (true, Ok(uvres)) => {
            info!("Plotting (l,m) distribution...");
            let path = out("impeak");
            cands::plot_lm(&path, &pos, field_of_view(uvres), config.snr_size_exponent)?;
            written.push(path);
        }
        (true, Err(e)) => warn!("Skipping (l,m) plot: {e}"),
    }

    Ok(written)
}

/// Render the noise histograms of `paths`, dropping the segment ranges in
/// `remove`. Returns the file written.
pub fn plot_noise(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    remove: &NoiseRemoval,
    outroot: Option<&str>,
) -> Result<PathBuf> {
    let first = paths.first().context("no noise archives given")?;
    let outroot = outroot.map(str::to_string).unwrap_or_else(|| default_outroot(first));
    let workdir = first.parent().unwrap_or_else(|| Path::new(""));
    let outname = workdir.join(format!("{outroot}_noisehist.png"));

    info!("Reading {} noise files", paths.len());
    let mut noises = Vec::with_capacity(paths.len());
    for path in paths {
        let table = read_noise(path)?;
        noises.push(kept_image_noise(&table, scan_number(path), remove));
    }

    let hist = noise_histogram(&noises, config.noise_hist_edges)?;
    noise::plot_noisehist(&outname, &hist)?;
    Ok(outname)
}

/// Build pulse-rate curves for `paths` and render them to `outname`.
pub fn plot_psrrates(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    labels: &[String],
    outname: &Path,
) -> Result<RateCurves> {
    let curves = make_psrrates(paths, &config.rate_curve_options())?;
    rates::plot_rate_curves(outname, &curves.curves, labels)?;

    let typical = typical_ratios(&curves.curves);
    if !typical.is_empty() {
        let text: Vec<String> = typical
            .iter()
            .map(|(k, r)| format!("{k}/0: {r:.3}"))
            .collect();
        info!("flux ratio ({})", text.join(", "));
    }
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_and_padding() {
        assert_eq!(span([3.0, -1.0, f64::NAN, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(span(Vec::<f64>::new()), None);
        assert_eq!(padded((1.0, 1.0)), 0.5..1.5);
        let r = padded((0.0, 100.0));
        assert_eq!((r.start, r.end), (-2.0, 102.0));
    }

    #[test]
    fn test_marker_radius_clamped() {
        assert_eq!(marker_radius(0.0), 1);
        assert_eq!(marker_radius(100.0), 5);
        assert_eq!(marker_radius(1e9), 30);
    }

    #[test]
    fn test_default_outroot() {
        assert_eq!(
            default_outroot(Path::new("cands_14A-425_sb1_sc2.pkl")),
            "plot_14A-425_sb1"
        );
    }
}
