use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn};

use rtcands::analysis::time::absolute_times;
use rtcands::config::AnalysisConfig;
use rtcands::data::export::{export_table, CandidateTable};
use rtcands::data::filter::NoiseRemoval;
use rtcands::data::loader::read_candidates;
use rtcands::data::merge::merge_archives;
use rtcands::plot;

#[derive(Parser)]
#[command(name = "rtcands")]
#[command(about = "Merge, analyse and plot transient-search candidate archives", long_about = None)]
struct Cli {
    /// JSON file overriding analysis parameters
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge per-segment cands_*.pkl or noise_*.pkl archives into one
    Merge {
        /// Archives to merge; the kind is taken from the first file name
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output root (cands_<ROOT>.pkl / noise_<ROOT>.pkl)
        #[arg(long)]
        root: Option<String>,
    },
    /// DM-time, count, normal-probability and sky-offset plots of candidates
    PlotCands {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory for the PNG files (default: archive workdir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        #[arg(long)]
        outroot: Option<String>,
    },
    /// Histograms of image noise measurements
    PlotNoise {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Segment ranges to drop, as SCAN:LO,HI[,LO,HI...]; repeatable
        #[arg(long, value_name = "SCAN:RANGES", value_parser = parse_removal)]
        remove: Vec<(i64, Vec<f64>)>,

        #[arg(long)]
        outroot: Option<String>,
    },
    /// Flux against pulse rate for a pulsar scan and its offset scans
    Psrrates {
        /// Reference (on-axis) scan first, then offset scans
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Pulsar period (s)
        #[arg(long)]
        period: Option<f64>,

        /// Points in the rate grid
        #[arg(long)]
        nbins: Option<usize>,

        /// Use the duration of scan 1 for every offset scan
        #[arg(long, action = ArgAction::SetTrue)]
        legacy_offset_duration: bool,

        /// Legend labels, one per scan
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,

        /// Output PNG
        #[arg(long, default_value = "psrrates.png")]
        out: PathBuf,
    },
    /// Write the candidates of one archive as csv, json or parquet
    Export {
        archive: PathBuf,

        /// Output file; format from the extension
        out: PathBuf,
    },
    /// Print candidate counts and columns of archives
    Summary {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Parse `SCAN:LO,HI[,LO,HI...]` into a scan number and its range bounds.
fn parse_removal(arg: &str) -> Result<(i64, Vec<f64>), String> {
    let (scan, ranges) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected SCAN:LO,HI, got '{arg}'"))?;
    let scan: i64 = scan
        .trim()
        .parse()
        .map_err(|e| format!("bad scan number '{scan}': {e}"))?;
    let bounds = ranges
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("bad bound '{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if bounds.is_empty() || bounds.len() % 2 != 0 {
        return Err(format!("ranges of scan {scan} need LO,HI pairs"));
    }
    Ok((scan, bounds))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = AnalysisConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Merge { paths, root } => {
            let out = merge_archives(&paths, root.as_deref())?;
            println!("Merged {} archives into {}", paths.len(), out.display());
        }
        Commands::PlotCands {
            paths,
            out_dir,
            outroot,
        } => {
            let written = plot::plot_cands(&paths, &config, out_dir.as_deref(), outroot.as_deref())?;
            for path in &written {
                println!("Wrote {}", path.display());
            }
        }
        Commands::PlotNoise {
            paths,
            remove,
            outroot,
        } => {
            let mut removal = NoiseRemoval::new();
            for (scan, bounds) in remove {
                removal.entry(scan).or_default().extend(bounds);
            }
            let out = plot::plot_noise(&paths, &config, &removal, outroot.as_deref())?;
            println!("Wrote {}", out.display());
        }
        Commands::Psrrates {
            paths,
            period,
            nbins,
            legacy_offset_duration,
            labels,
            out,
        } => {
            if let Some(p) = period {
                config.period = p;
            }
            if let Some(n) = nbins {
                config.nbins = n;
            }
            config.legacy_offset_duration |= legacy_offset_duration;
            if !labels.is_empty() && labels.len() != paths.len() {
                bail!("{} labels given for {} scans", labels.len(), paths.len());
            }

            let curves = plot::plot_psrrates(&paths, &config, &labels, &out)?;
            println!("Flux column: {}", curves.flux_column);
            for (k, scan) in curves.scans.iter().enumerate() {
                let npoints = curves.curves.get(&k).map_or(0, |c| c.len());
                println!(
                    "  scan {k}: {} pulses over {:.1} s, {npoints} curve points",
                    scan.len(),
                    scan.duration
                );
            }
            println!("Wrote {}", out.display());
        }
        Commands::Export { archive, out } => {
            let cands = read_candidates(&archive)?;
            let times = match absolute_times(&cands.state, &cands.candidates.locations) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Exporting without times: {e}");
                    None
                }
            };
            let table = CandidateTable::new(&cands, times);
            export_table(&table, &out)
                .with_context(|| format!("exporting {}", archive.display()))?;
            println!("Wrote {} candidates to {}", table.len(), out.display());
        }
        Commands::Summary { paths } => {
            let mut total = 0;
            for path in &paths {
                let cands = read_candidates(path)?;
                let state = &cands.state;
                println!("{}", path.display());
                println!("  candidates: {}", cands.candidates.len());
                println!("  locations:  {}", state.locations.names().join(", "));
                println!("  features:   {}", state.features.names().join(", "));
                if let Ok(times) = absolute_times(state, &cands.candidates.locations) {
                    let lo = times.iter().copied().fold(f64::INFINITY, f64::min);
                    let hi = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    if lo <= hi {
                        println!("  time span:  {:.3} s", hi - lo);
                    }
                }
                total += cands.candidates.len();
            }
            info!("{total} candidates in {} archives", paths.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_removal() {
        assert_eq!(parse_removal("3:10,20,30,40"), Ok((3, vec![10.0, 20.0, 30.0, 40.0])));
        assert!(parse_removal("3:10").is_err());
        assert!(parse_removal("x:1,2").is_err());
        assert!(parse_removal("10,20").is_err());
    }

    #[test]
    fn test_cli_parses_psrrates() {
        let cli = Cli::try_parse_from([
            "rtcands",
            "psrrates",
            "a.pkl",
            "b.pkl",
            "--period",
            "0.0892",
            "--labels",
            "on,off",
        ])
        .unwrap();
        match cli.command {
            Commands::Psrrates {
                paths,
                period,
                labels,
                ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(period, Some(0.0892));
                assert_eq!(labels, vec!["on", "off"]);
            }
            _ => panic!("expected psrrates"),
        }
    }
}
