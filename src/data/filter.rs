use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use super::model::NoiseTable;

// ---------------------------------------------------------------------------
// Candidate selections: predicates → row indices
// ---------------------------------------------------------------------------

/// Indices of rows with a strictly positive SNR.
pub fn positive_indices(snrs: &[f64]) -> Vec<usize> {
    snrs.iter()
        .enumerate()
        .filter(|(_, &snr)| snr > 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Indices of rows found at dt trial `dtind`.
pub fn dt_indices(dts: &[i64], dtind: i64) -> Vec<usize> {
    dts.iter()
        .enumerate()
        .filter(|(_, &dt)| dt == dtind)
        .map(|(i, _)| i)
        .collect()
}

/// Gather `values` at `indices`.
pub fn select<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i]).collect()
}

/// Sorted distinct dt trial indices present.
pub fn unique_dts(dts: &[i64]) -> Vec<i64> {
    let mut unique = dts.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

// ---------------------------------------------------------------------------
// Noise removal ranges
// ---------------------------------------------------------------------------

/// Segment ranges to drop per scan: scan → `[lo0, hi0, lo1, hi1, …]`.
/// A measurement is dropped when `lo < segment < hi` for any pair.
pub type NoiseRemoval = BTreeMap<i64, Vec<f64>>;

/// Scan number encoded in a file name as `_sc<N>.`, e.g. `noise_x_sc12.pkl`.
pub fn scan_number(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    let (_, tail) = name.split_once("_sc")?;
    let digits = tail.split('.').next()?;
    digits.parse().ok()
}

/// Image-noise samples of `table` that survive the removal ranges of `scan`.
pub fn kept_image_noise(table: &NoiseTable, scan: Option<i64>, remove: &NoiseRemoval) -> Vec<f64> {
    let ranges = match scan.and_then(|s| remove.get(&s)) {
        Some(r) => r,
        None => return table.image_noise.clone(),
    };

    let kept: Vec<f64> = table
        .segments
        .iter()
        .zip(&table.image_noise)
        .filter(|(&seg, _)| {
            let seg = seg as f64;
            !ranges
                .chunks_exact(2)
                .any(|pair| seg > pair[0] && seg < pair[1])
        })
        .map(|(_, &noise)| noise)
        .collect();
    debug!(
        "scan {scan:?}: removed {} of {} noise measurements",
        table.image_noise.len() - kept.len(),
        table.image_noise.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_and_dt_selection() {
        let snrs = [6.0, -7.0, 0.0, 8.5];
        assert_eq!(positive_indices(&snrs), vec![0, 3]);
        let dts = [0, 1, 0, 2];
        assert_eq!(dt_indices(&dts, 0), vec![0, 2]);
        assert_eq!(select(&snrs, &[3, 0]), vec![8.5, 6.0]);
        assert_eq!(unique_dts(&[2, 0, 2, 1]), vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_number() {
        assert_eq!(scan_number(Path::new("/d/noise_14A_sb1_sc12.pkl")), Some(12));
        assert_eq!(scan_number(Path::new("noise_14A_sb1_sc3_seg2.pkl")), None);
        assert_eq!(scan_number(Path::new("noise.pkl")), None);
    }

    #[test]
    fn test_kept_image_noise_drops_open_ranges() {
        let table = NoiseTable {
            segments: vec![0, 1, 2, 3, 4],
            noise_per_bl: vec![0.0; 5],
            flag_fraction: vec![0.0; 5],
            image_noise: vec![10.0, 11.0, 12.0, 13.0, 14.0],
        };
        let remove = NoiseRemoval::from([(7, vec![0.0, 2.0, 3.0, 9.0])]);

        // segment 1 is inside (0, 2); segment 4 inside (3, 9); bounds are exclusive
        assert_eq!(
            kept_image_noise(&table, Some(7), &remove),
            vec![10.0, 12.0, 13.0]
        );
        assert_eq!(kept_image_noise(&table, Some(8), &remove).len(), 5);
        assert_eq!(kept_image_noise(&table, None, &remove).len(), 5);
    }
}
