use std::path::{Path, PathBuf};

use crate::error::{CandError, ColumnKind, Result};

// ---------------------------------------------------------------------------
// ColumnRegistry – named columns resolved to fixed offsets
// ---------------------------------------------------------------------------

/// Ordered column names of one axis of an archive (`features` or `featureind`).
///
/// Lookups are resolved once into integer offsets; anything absent fails with
/// [`CandError::MissingColumn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRegistry {
    kind: ColumnKind,
    names: Vec<String>,
}

impl ColumnRegistry {
    pub fn new(kind: ColumnKind, names: Vec<String>) -> Self {
        Self { kind, names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Offset of `name`, or `MissingColumn`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| CandError::missing(self.kind, name))
    }

    /// First name of `candidates` present in the registry, in priority order.
    pub fn first_of(&self, candidates: &[String]) -> Result<ResolvedColumn> {
        candidates
            .iter()
            .find_map(|name| {
                self.names
                    .iter()
                    .position(|n| n == name)
                    .map(|index| ResolvedColumn {
                        index,
                        name: name.clone(),
                    })
            })
            .ok_or_else(|| CandError::missing(self.kind, &candidates.join("|")))
    }
}

/// A column name together with its resolved offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
}

// ---------------------------------------------------------------------------
// ArchiveState – record 1 of a candidate archive
// ---------------------------------------------------------------------------

/// Interpreted metadata of a candidate archive.
///
/// Only `features` and `featureind` are mandatory at load time. The numeric
/// parameters are checked by the accessors of the operations that need them.
#[derive(Debug, Clone)]
pub struct ArchiveState {
    /// File the record was read from, used in error messages.
    pub source: PathBuf,
    pub features: ColumnRegistry,
    pub locations: ColumnRegistry,
    /// Dispersion-measure trial values (pc/cm3).
    pub dmarr: Vec<f64>,
    /// Time-averaging factor of each dt trial.
    pub dtarr: Vec<f64>,
    /// Start time of each segment (MJD days).
    pub segment_starts: Vec<f64>,
    /// Integration time (s).
    pub inttime: Option<f64>,
    pub workdir: Option<PathBuf>,
    pub npixx: Option<f64>,
    pub npixy: Option<f64>,
    pub uvres: Option<f64>,
    pub nints: Option<f64>,
    pub goodintcount: Option<f64>,
}

impl ArchiveState {
    fn require(&self, name: &str, value: Option<f64>) -> Result<f64> {
        value.ok_or_else(|| {
            CandError::corrupt(&self.source, format!("metadata lacks numeric '{name}'"))
        })
    }

    pub fn inttime(&self) -> Result<f64> {
        self.require("inttime", self.inttime)
    }

    pub fn uvres(&self) -> Result<f64> {
        self.require("uvres", self.uvres)
    }

    /// Number of image pixels searched per integration.
    pub fn npix(&self) -> Result<f64> {
        Ok(self.require("npixx", self.npixx)? * self.require("npixy", self.npixy)?)
    }

    /// Integrations searched: `goodintcount` when recorded, else `nints`.
    pub fn searched_ints(&self) -> Result<f64> {
        match self.goodintcount {
            Some(count) => Ok(count),
            None => self.require("nints", self.nints),
        }
    }

    /// Start of segment `segment` (MJD days).
    pub fn segment_start(&self, segment: i64) -> Result<f64> {
        usize::try_from(segment)
            .ok()
            .and_then(|s| self.segment_starts.get(s).copied())
            .ok_or_else(|| {
                CandError::corrupt(
                    &self.source,
                    format!(
                        "segment {segment} outside segmenttimes ({} entries)",
                        self.segment_starts.len()
                    ),
                )
            })
    }

    /// DM value of trial `dmind`.
    pub fn dm(&self, dmind: i64) -> Result<f64> {
        usize::try_from(dmind)
            .ok()
            .and_then(|i| self.dmarr.get(i).copied())
            .ok_or_else(|| {
                CandError::corrupt(&self.source, format!("dm index {dmind} outside dmarr"))
            })
    }

    /// Output directory recorded in the archive, if it exists on this machine.
    pub fn existing_workdir(&self) -> Option<&Path> {
        self.workdir.as_deref().filter(|p| p.is_dir())
    }
}

// ---------------------------------------------------------------------------
// Candidates – aligned location / feature rows
// ---------------------------------------------------------------------------

/// Location keys and feature vectors, row-aligned and sorted by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub locations: Vec<Vec<i64>>,
    pub features: Vec<Vec<f64>>,
}

impl Candidates {
    /// Build from unsorted `(key, features)` pairs. Rows end up in ascending
    /// lexicographic key order.
    pub fn from_rows(mut rows: Vec<(Vec<i64>, Vec<f64>)>) -> Self {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let (locations, features) = rows.into_iter().unzip();
        Self {
            locations,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// One location axis as a column.
    pub fn location_column(&self, index: usize) -> Vec<i64> {
        self.locations.iter().map(|row| row[index]).collect()
    }

    /// One feature as a column.
    pub fn feature_column(&self, index: usize) -> Vec<f64> {
        self.features.iter().map(|row| row[index]).collect()
    }
}

/// One loaded candidate archive.
#[derive(Debug, Clone)]
pub struct CandidateArchive {
    pub state: ArchiveState,
    pub candidates: Candidates,
}

// ---------------------------------------------------------------------------
// NoiseTable – contents of a noise archive
// ---------------------------------------------------------------------------

/// Columns of a noise archive, one entry per noise measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoiseTable {
    pub segments: Vec<i64>,
    pub noise_per_bl: Vec<f64>,
    pub flag_fraction: Vec<f64>,
    pub image_noise: Vec<f64>,
}

impl NoiseTable {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> ColumnRegistry {
        ColumnRegistry::new(
            ColumnKind::Feature,
            names.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_index_of_missing_column() {
        let reg = registry(&["snr1", "l1"]);
        assert_eq!(reg.index_of("l1").unwrap(), 1);
        match reg.index_of("m1") {
            Err(CandError::MissingColumn { kind, name }) => {
                assert_eq!(kind, ColumnKind::Feature);
                assert_eq!(name, "m1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_first_of_priority() {
        let priority: Vec<String> = ["immax2", "immax1", "snr1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let both = registry(&["snr1", "immax1", "immax2"]);
        assert_eq!(both.first_of(&priority).unwrap().name, "immax2");

        let one = registry(&["snr1", "immax1"]);
        let col = one.first_of(&priority).unwrap();
        assert_eq!((col.index, col.name.as_str()), (1, "immax1"));

        let snr_only = registry(&["l1", "snr1"]);
        assert_eq!(snr_only.first_of(&priority).unwrap().name, "snr1");

        assert!(matches!(
            registry(&["l1", "m1"]).first_of(&priority),
            Err(CandError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_from_rows_sorts_lexicographically() {
        let cands = Candidates::from_rows(vec![
            (vec![1, 0], vec![3.0]),
            (vec![0, 5], vec![2.0]),
            (vec![0, 1], vec![1.0]),
        ]);
        assert_eq!(cands.locations, vec![vec![0, 1], vec![0, 5], vec![1, 0]]);
        assert_eq!(cands.feature_column(0), vec![1.0, 2.0, 3.0]);
        assert_eq!(cands.location_column(1), vec![1, 5, 0]);
    }
}
