use crate::data::model::ArchiveState;
use crate::error::Result;

pub const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// Location columns needed to place a candidate in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeColumns {
    pub segment: usize,
    pub int: usize,
}

impl TimeColumns {
    pub fn resolve(state: &ArchiveState) -> Result<Self> {
        Ok(Self {
            segment: state.locations.index_of("segment")?,
            int: state.locations.index_of("int")?,
        })
    }
}

/// Absolute time in MJD seconds of every location row:
/// `segment_start · 86400 + int · inttime`.
///
/// An empty location array yields an empty result without consulting the
/// metadata; otherwise missing `segment`/`int` axes fail with `MissingColumn`.
pub fn absolute_times(state: &ArchiveState, locations: &[Vec<i64>]) -> Result<Vec<f64>> {
    if locations.is_empty() {
        return Ok(Vec::new());
    }
    let cols = TimeColumns::resolve(state)?;
    let inttime = state.inttime()?;

    locations
        .iter()
        .map(|row| {
            let t0 = state.segment_start(row[cols.segment])?;
            Ok(t0 * SECONDS_PER_DAY + row[cols.int] as f64 * inttime)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnRegistry;
    use crate::error::{CandError, ColumnKind};
    use std::path::PathBuf;

    fn state(axes: &[&str]) -> ArchiveState {
        ArchiveState {
            source: PathBuf::from("cands.pkl"),
            features: ColumnRegistry::new(ColumnKind::Feature, vec!["snr1".into()]),
            locations: ColumnRegistry::new(
                ColumnKind::Location,
                axes.iter().map(|s| s.to_string()).collect(),
            ),
            dmarr: vec![0.0],
            dtarr: vec![1.0],
            segment_starts: vec![1.0, 2.0],
            inttime: Some(0.5),
            workdir: None,
            npixx: None,
            npixy: None,
            uvres: None,
            nints: None,
            goodintcount: None,
        }
    }

    #[test]
    fn test_absolute_times() {
        let s = state(&["segment", "int", "dmind"]);
        let times = absolute_times(&s, &[vec![0, 0, 0], vec![0, 4, 0], vec![1, 2, 0]]).unwrap();
        assert_eq!(times, vec![86400.0, 86402.0, 172801.0]);
    }

    #[test]
    fn test_empty_locations_never_fail() {
        // no segment/int axes at all, still fine on empty input
        let s = state(&["dmind"]);
        assert!(absolute_times(&s, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_axis() {
        let s = state(&["segment", "dmind"]);
        match absolute_times(&s, &[vec![0, 0]]) {
            Err(CandError::MissingColumn { kind, name }) => {
                assert_eq!(kind, ColumnKind::Location);
                assert_eq!(name, "int");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_segment_out_of_range_is_corrupt() {
        let s = state(&["segment", "int"]);
        assert!(matches!(
            absolute_times(&s, &[vec![5, 0]]),
            Err(CandError::CorruptArchive { .. })
        ));
    }
}
