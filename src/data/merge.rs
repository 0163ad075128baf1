use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_pickle::Value;

use super::loader::{parse_state, read_raw_archive};
use super::pickle::{self, write_records, RecordReader};
use crate::error::{CandError, Result};

/// What kind of archive a file holds, judged from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Cands,
    Noise,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.contains("cands") {
            Some(ArchiveKind::Cands)
        } else if name.contains("noise") {
            Some(ArchiveKind::Noise)
        } else {
            None
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ArchiveKind::Cands => "cands",
            ArchiveKind::Noise => "noise",
        }
    }
}

/// Default root of derived file names: tokens 1..3 of the file name split on `_`.
///
/// `cands_14A-425_sb123_sc4_seg0.pkl` → `14A-425_sb123`.
pub fn file_root(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.split('_').skip(1).take(2).collect::<Vec<_>>().join("_")
}

/// Union the candidate mappings of `paths` into one archive at `out`.
///
/// Inputs are applied in the given order, so the last file wins on a key
/// collision. The metadata record written is the last input's. All inputs must
/// carry the same `features` and `featureind` registries.
pub fn merge_cands(paths: &[PathBuf], out: &Path) -> Result<usize> {
    let (first, rest) = paths
        .split_first()
        .ok_or_else(|| CandError::InvalidParameter("no archives to merge".into()))?;
    info!("Aggregating cands from {} files", paths.len());

    let first_raw = read_raw_archive(first)?;
    let reference = parse_state(first, &first_raw.state)?;
    let mut state = first_raw.state;
    let mut cands = first_raw.cands;

    for path in rest {
        let raw = read_raw_archive(path)?;
        let other = parse_state(path, &raw.state)?;
        if other.features != reference.features || other.locations != reference.locations {
            return Err(CandError::SchemaMismatch {
                path: path.clone(),
                reason: format!(
                    "columns {:?}/{:?} differ from {:?}/{:?} in {}",
                    other.features.names(),
                    other.locations.names(),
                    reference.features.names(),
                    reference.locations.names(),
                    first.display()
                ),
            });
        }
        let before = cands.len() + raw.cands.len();
        cands.extend(raw.cands);
        let overwritten = before - cands.len();
        if overwritten > 0 {
            warn!(
                "{}: {overwritten} candidates replace earlier entries",
                path.display()
            );
        }
        state = raw.state;
    }

    let count = cands.len();
    write_records(out, &[&state, &Value::Dict(cands)])?;
    info!("Wrote {count} candidates to {}", out.display());
    Ok(count)
}

/// Concatenate the noise lists of `paths`, in order, into one archive at `out`.
pub fn merge_noise(paths: &[PathBuf], out: &Path) -> Result<usize> {
    if paths.is_empty() {
        return Err(CandError::InvalidParameter("no archives to merge".into()));
    }
    info!("Aggregating noise from {} files", paths.len());

    let mut noise = Vec::new();
    for path in paths {
        let record = RecordReader::open(path)?.next_record("noise record")?;
        match record {
            Value::List(items) => noise.extend(items),
            other => {
                return Err(CandError::corrupt(
                    path,
                    format!(
                        "noise record is a {}, expected a list",
                        pickle::kind_name(&other)
                    ),
                ))
            }
        }
    }

    let count = noise.len();
    write_records(out, &[&Value::List(noise)])?;
    info!("Wrote {count} noise measurements to {}", out.display());
    Ok(count)
}

/// Merge `paths` next to the first input, choosing the kind from its file name.
///
/// Output is `cands_<root>.pkl` or `noise_<root>.pkl`; `root` defaults to
/// [`file_root`] of the first input.
pub fn merge_archives(paths: &[PathBuf], root: Option<&str>) -> Result<PathBuf> {
    let first = paths
        .first()
        .ok_or_else(|| CandError::InvalidParameter("no archives to merge".into()))?;
    let kind = ArchiveKind::from_path(first).ok_or_else(|| {
        CandError::InvalidParameter(format!(
            "cannot tell archive kind of {} (expected 'cands' or 'noise' in the name)",
            first.display()
        ))
    })?;
    let root = root.map(str::to_string).unwrap_or_else(|| file_root(first));
    let workdir = first.parent().unwrap_or_else(|| Path::new(""));
    let out = workdir.join(format!("{}_{root}.pkl", kind.prefix()));

    match kind {
        ArchiveKind::Cands => merge_cands(paths, &out)?,
        ArchiveKind::Noise => merge_noise(paths, &out)?,
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_root() {
        assert_eq!(
            file_root(Path::new("/data/cands_14A-425_sb123_sc4_seg0.pkl")),
            "14A-425_sb123"
        );
        assert_eq!(file_root(Path::new("cands.pkl")), "");
    }

    #[test]
    fn test_archive_kind() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("a/cands_x_sc1.pkl")),
            Some(ArchiveKind::Cands)
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("noise_x_sc1.pkl")),
            Some(ArchiveKind::Noise)
        );
        assert_eq!(ArchiveKind::from_path(Path::new("other.pkl")), None);
    }

    #[test]
    fn test_merge_requires_input() {
        assert!(matches!(
            merge_archives(&[], None),
            Err(CandError::InvalidParameter(_))
        ));
    }
}
