use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use super::{marker_radius, padded, span};
use crate::analysis::stats::{arcmin, dt_label, marker_sizes, DtCounts, NormalQuantiles};
use crate::analysis::time::SECONDS_PER_DAY;
use crate::color::ColorMap;
use crate::data::filter::{dt_indices, unique_dts};
use crate::state::CandidateSet;

/// DM versus time, one panel per dt trial, marker size growing with SNR.
pub fn plot_dmt(
    path: &Path,
    cands: &CandidateSet,
    dtarr: &[f64],
    size_exponent: i32,
) -> Result<()> {
    let Some((t0, t1)) = span(cands.times.iter().copied()) else {
        return Ok(());
    };
    let dm_range = padded(span(cands.dms.iter().copied()).unwrap_or((0.0, 1.0)));
    let t_range = padded((0.0, t1 - t0));
    let sizes = marker_sizes(&cands.snrs, size_exponent);
    let dts = unique_dts(&cands.dts);
    let colors = ColorMap::new(&dts);

    let root = BitMapBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((dts.len(), 1));

    for (area, &dtind) in panels.iter().zip(&dts) {
        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(t_range.clone(), dm_range.clone())?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(format!("Time (s) after MJD {:.5}", t0 / SECONDS_PER_DAY))
            .y_desc("DM (pc/cm3)")
            .draw()?;

        let color = colors.color_for(&dtind);
        chart
            .draw_series(dt_indices(&cands.dts, dtind).into_iter().map(|i| {
                Circle::new(
                    (cands.times[i] - t0, cands.dms[i]),
                    marker_radius(sizes[i]),
                    color.mix(0.3).stroke_width(1),
                )
            }))?
            .label(dt_label(dtarr, dtind))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Candidates per second for each dt trial. Big clusters often trace RFI.
pub fn plot_dmcount(path: &Path, counts: &[DtCounts]) -> Result<()> {
    let root = BitMapBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    if counts.is_empty() {
        root.present()?;
        return Ok(());
    }

    let start = counts.iter().map(|c| c.start).min().unwrap_or(0);
    let end = counts
        .iter()
        .map(|c| c.start + c.counts.len() as i64)
        .max()
        .unwrap_or(start + 1);
    let colors = ColorMap::new(counts.iter().map(|c| &c.dtind));
    let panels = root.split_evenly((counts.len(), 1));

    for (area, dt) in panels.iter().zip(counts) {
        let cmax = dt.counts.iter().copied().max().unwrap_or(0) as f64;
        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .x_label_area_size(35)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..(end - start) as f64, 0f64..(1.1 * cmax).max(1.0))?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(format!("Time (s) after {start} s"))
            .y_desc("Count")
            .draw()?;

        let color = colors.color_for(&dt.dtind);
        let offset = (dt.start - start) as f64;
        chart
            .draw_series(dt.counts.iter().enumerate().map(|(i, &c)| {
                Circle::new(
                    (offset + i as f64, c as f64),
                    3,
                    color.mix(0.5).stroke_width(1),
                )
            }))?
            .label(match dt.dt {
                Some(factor) => format!("dt={factor}"),
                None => format!("dtind={}", dt.dtind),
            })
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        chart.draw_series(dt.high.iter().map(|&i| {
            Cross::new((offset + i as f64, dt.counts[i] as f64), 6, RED.stroke_width(2))
        }))?;
        chart
            .configure_series_labels()
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Observed SNR against the normal-quantile SNR expected at the same rank.
/// Positive candidates in red, negative (absolute) in blue.
pub fn plot_normprob(path: &Path, quantiles: &NormalQuantiles) -> Result<()> {
    let points = quantiles.positive.iter().chain(&quantiles.negative);
    let Some((lo, hi)) = span(points.flat_map(|&(s, z)| [s, z])) else {
        return Ok(());
    };

    let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let range = padded((lo, hi));
    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(range.clone(), range)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("SNR")
        .y_desc("Normal quantile SNR")
        .draw()?;

    chart
        .draw_series(
            quantiles
                .positive
                .iter()
                .map(|&(s, z)| Circle::new((s, z), 2, RED.filled())),
        )?
        .label("positive")
        .legend(|(x, y)| Circle::new((x, y), 3, RED.filled()));
    if !quantiles.negative.is_empty() {
        chart
            .draw_series(
                quantiles
                    .negative
                    .iter()
                    .map(|&(s, z)| Circle::new((s, z), 2, BLUE.filled())),
            )?
            .label("negative")
            .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));
    }
    chart.draw_series(LineSeries::new([(lo, lo), (hi, hi)], BLACK))?;
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Peak-pixel offsets from the phase center across the field of view.
/// Offsets increase to the left, as on the sky.
pub fn plot_lm(path: &Path, cands: &CandidateSet, fov: f64, size_exponent: i32) -> Result<()> {
    let sizes = marker_sizes(&cands.snrs, size_exponent);
    let half = fov / 2.0;

    let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-half..half, -half..half)?;
    // x is drawn mirrored, so labels show the negated coordinate
    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&|v| format!("{:.1}", -v))
        .x_desc("RA offset (arcmin)")
        .y_desc("Dec offset (arcmin)")
        .draw()?;

    chart.draw_series(cands.l1s.iter().zip(&cands.m1s).zip(&sizes).map(
        |((&l, &m), &size)| {
            Circle::new(
                (-arcmin(l), arcmin(m)),
                marker_radius(size),
                BLUE.mix(0.5).stroke_width(1),
            )
        },
    ))?;

    root.present()?;
    Ok(())
}
