//! Writes a synthetic pulsar observation: one on-axis and two offset scans,
//! each as a `cands_*.pkl` and a `noise_*.pkl` archive.
//!
//! Usage: `generate_sample [OUTDIR]`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_pickle::{HashableValue, Value};

use rtcands::data::pickle::{float_list, key_value, str_list, write_records};

const PERIOD: f64 = 0.0892;
const INTTIME: f64 = 0.005;
const NINTS: i64 = 2000;
const NSEGMENTS: i64 = 3;
const MJD_START: f64 = 56_734.25;
const SNR_THRESHOLD: f64 = 6.0;
const DMARR: [f64; 3] = [0.0, 67.9, 135.8];
const DTARR: [f64; 2] = [1.0, 2.0];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One simulated scan: a pulsar seen through a primary beam of gain `gain`,
/// offset by `(l, m)` radians from the phase center.
struct Scan {
    number: i64,
    gain: f64,
    l: f64,
    m: f64,
}

fn state_record(workdir: &Path, segment_starts: &[f64]) -> Value {
    let mut map = BTreeMap::new();
    let mut put = |k: &str, v: Value| {
        map.insert(HashableValue::String(k.to_string()), v);
    };
    put("features", str_list(&["snr1", "immax1", "l1", "m1"]));
    put(
        "featureind",
        str_list(&["segment", "int", "dmind", "dtind", "beamnum"]),
    );
    put("dmarr", float_list(&DMARR));
    put("dtarr", float_list(&DTARR));
    put(
        "segmenttimes",
        Value::List(
            segment_starts
                .iter()
                .map(|&s| float_list(&[s, s + NINTS as f64 * INTTIME / 86400.0]))
                .collect(),
        ),
    );
    put("inttime", Value::F64(INTTIME));
    put("nints", Value::I64(NINTS * NSEGMENTS));
    put("npixx", Value::I64(1024));
    put("npixy", Value::I64(1024));
    put("uvres", Value::I64(60));
    put("searchtype", Value::String("image1".into()));
    put("workdir", Value::String(workdir.display().to_string()));
    Value::Dict(map)
}

/// Candidates of one scan: one pulse per rotation plus scattered noise events.
fn scan_candidates(scan: &Scan, rng: &mut SimpleRng) -> BTreeMap<HashableValue, Value> {
    let mut cands = BTreeMap::new();
    let mut add = |key: [i64; 5], snr: f64, flux: f64, l: f64, m: f64| {
        cands.insert(key_value(&key), float_list(&[snr, flux, l, m]));
    };

    let duration = NINTS as f64 * INTTIME;
    for segment in 0..NSEGMENTS {
        let npulses = (duration / PERIOD) as i64;
        for p in 0..npulses {
            // lognormal pulse energies
            let flux = scan.gain * 0.02 * rng.gauss(0.0, 0.6).exp();
            let snr = flux / 0.002 + rng.gauss(0.0, 0.5);
            if snr < SNR_THRESHOLD {
                continue;
            }
            let int = ((p as f64 * PERIOD) / INTTIME) as i64;
            let dtind = if rng.next_f64() < 0.2 { 1 } else { 0 };
            let l = scan.l + rng.gauss(0.0, 2e-5);
            let m = scan.m + rng.gauss(0.0, 2e-5);
            add([segment, int, 1, dtind, 0], snr, flux, l, m);
        }

        for _ in 0..25 {
            let int = (rng.next_f64() * NINTS as f64) as i64;
            let dmind = (rng.next_f64() * DMARR.len() as f64) as i64;
            let sign = if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
            let snr = sign * (SNR_THRESHOLD + rng.gauss(0.0, 0.4).abs());
            let l = rng.gauss(0.0, 5e-3);
            let m = rng.gauss(0.0, 5e-3);
            add([segment, int, dmind, 0, 0], snr, snr * 0.002, l, m);
        }
    }
    cands
}

/// `(segment, noise per baseline, flagged fraction, image noise)` samples.
fn scan_noise(rng: &mut SimpleRng) -> Value {
    let mut entries = Vec::new();
    for segment in 0..NSEGMENTS {
        for _ in 0..40 {
            let imnoise = rng.gauss(0.002, 0.0002).abs();
            entries.push(Value::Tuple(vec![
                Value::I64(segment),
                Value::F64(imnoise * 30.0),
                Value::F64(rng.next_f64() * 0.1),
                Value::F64(imnoise),
            ]));
        }
    }
    Value::List(entries)
}

fn main() -> Result<()> {
    env_logger::init();
    let outdir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("creating {}", outdir.display()))?;

    let mut rng = SimpleRng::new(42);
    let scans = [
        Scan { number: 1, gain: 1.0, l: 0.0, m: 0.0 },
        Scan { number: 2, gain: 0.7, l: 2.4e-3, m: 0.0 },
        Scan { number: 3, gain: 0.35, l: 4.8e-3, m: 0.0 },
    ];

    let scan_length = NSEGMENTS as f64 * NINTS as f64 * INTTIME / 86400.0;
    for (i, scan) in scans.iter().enumerate() {
        let t0 = MJD_START + i as f64 * (scan_length + 60.0 / 86400.0);
        let starts: Vec<f64> = (0..NSEGMENTS)
            .map(|s| t0 + s as f64 * NINTS as f64 * INTTIME / 86400.0)
            .collect();

        let cands = scan_candidates(scan, &mut rng);
        let ncands = cands.len();
        let path = outdir.join(format!("cands_sample_psr_sc{}.pkl", scan.number));
        write_records(&path, &[&state_record(&outdir, &starts), &Value::Dict(cands)])?;
        println!("Wrote {ncands} candidates to {}", path.display());

        let path = outdir.join(format!("noise_sample_psr_sc{}.pkl", scan.number));
        write_records(&path, &[&scan_noise(&mut rng)])?;
        println!("Wrote noise samples to {}", path.display());
    }

    Ok(())
}
