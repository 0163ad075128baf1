use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use log::warn;
use plotters::prelude::*;

use super::span;
use crate::analysis::psrrates::{flux_ratios, RateCurve};
use crate::color::ColorMap;

/// Series label of scan `k`: the caller's label when given, else a generic one.
fn label(labels: &[String], k: usize) -> String {
    labels
        .get(k)
        .cloned()
        .unwrap_or_else(|| format!("Flux at scan {k}"))
}

/// Flux threshold against rate for every scan (log-log, above) and the flux
/// ratio of each offset scan to scan 0 (below), sharing the rate axis.
pub fn plot_rate_curves(
    path: &Path,
    curves: &BTreeMap<usize, RateCurve>,
    labels: &[String],
) -> Result<()> {
    let positive = |c: &RateCurve| -> Vec<(f64, f64)> {
        c.points().filter(|&(r, f)| r > 0.0 && f > 0.0).collect()
    };
    let series: Vec<(usize, Vec<(f64, f64)>)> =
        curves.iter().map(|(&k, c)| (k, positive(c))).collect();

    let root = BitMapBackend::new(path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let all = series.iter().flat_map(|(_, pts)| pts.iter().copied());
    let (Some((r0, r1)), Some((f0, f1))) = (
        span(all.clone().map(|(r, _)| r)),
        span(all.map(|(_, f)| f)),
    ) else {
        warn!("No positive rate-curve points to plot.");
        root.present()?;
        return Ok(());
    };
    let r_range = (r0 / 1.2)..(r1 * 1.2);
    let colors = ColorMap::new(curves.keys());
    let (upper, lower) = root.split_vertically(400);

    let mut chart = ChartBuilder::on(&upper)
        .margin(10)
        .x_label_area_size(10)
        .y_label_area_size(70)
        .build_cartesian_2d(r_range.clone().log_scale(), ((f0 / 1.2)..(f1 * 1.2)).log_scale())?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_desc("Flux")
        .draw()?;
    for (k, pts) in &series {
        let color = colors.color_for(k);
        chart
            .draw_series(pts.iter().map(|&p| Circle::new(p, 3, color.filled())))?
            .label(label(labels, *k))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .border_style(BLACK)
        .draw()?;

    let Some(reference) = curves.get(&0) else {
        root.present()?;
        return Ok(());
    };
    let ratios: Vec<(usize, RateCurve)> = curves
        .iter()
        .filter(|(&k, _)| k > 0)
        .map(|(&k, c)| (k, flux_ratios(reference, c)))
        .collect();
    let rmax = ratios
        .iter()
        .flat_map(|(_, r)| r.fluxes.iter().copied())
        .filter(|v| v.is_finite())
        .fold(1.0f64, f64::max);

    let mut chart = ChartBuilder::on(&lower)
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(r_range.log_scale(), 0f64..1.1 * rmax)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Rate (1/s)")
        .y_desc("Flux ratio")
        .draw()?;
    for (k, ratio) in &ratios {
        let color = colors.color_for(k);
        chart
            .draw_series(
                ratio
                    .points()
                    .filter(|&(r, v)| r > 0.0 && v.is_finite())
                    .map(|p| Circle::new(p, 3, color.filled())),
            )?
            .label(format!("{} / {}", label(labels, *k), label(labels, 0)))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }
    if !ratios.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
