use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use crate::analysis::stats::NoiseHistogram;
use crate::color::generate_palette;

/// Per-file image-noise histograms above, reverse-cumulative fraction below.
pub fn plot_noisehist(path: &Path, hist: &NoiseHistogram) -> Result<()> {
    let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically(500);

    if hist.edges.len() < 2 {
        root.present()?;
        return Ok(());
    }
    let lo = hist.edges[0];
    let hi = hist.edges[hist.edges.len() - 1];
    let x_range = if hi > lo { lo..hi } else { (lo - 0.5)..(hi + 0.5) };
    let nfiles = hist.per_file.len().max(1);
    let colors = generate_palette(nfiles);

    let ymax = hist
        .per_file
        .iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let mut chart = ChartBuilder::on(&upper)
        .caption("Histograms of noise samples", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0f64..1.1 * ymax)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Image RMS (Jy)")
        .y_desc("Number of noise measurements")
        .draw()?;

    // bars of the files share each bin side by side
    for (f, counts) in hist.per_file.iter().enumerate() {
        let color = colors[f];
        chart.draw_series(counts.iter().enumerate().filter(|(_, &c)| c > 0).map(|(b, &c)| {
            let (b0, b1) = (hist.edges[b], hist.edges[b + 1]);
            let w = (b1 - b0) / nfiles as f64;
            let x0 = b0 + f as f64 * w;
            Rectangle::new([(x0, 0.0), (x0 + w, c as f64)], color.filled())
        }))?;
    }

    let mut chart = ChartBuilder::on(&lower)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..1.05)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Image RMS (Jy)")
        .y_desc("Fraction with noise > image RMS")
        .draw()?;
    chart.draw_series(hist.cumulative_fraction.iter().enumerate().map(|(b, &frac)| {
        Rectangle::new(
            [(hist.edges[b], 0.0), (hist.edges[b + 1], frac)],
            BLUE.mix(0.6).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}
