use std::path::PathBuf;

use log::warn;

use crate::analysis::time::absolute_times;
use crate::config::AnalysisConfig;
use crate::data::filter::{positive_indices, select};
use crate::data::loader::read_candidates;
use crate::data::model::ArchiveState;
use crate::error::{CandError, Result};

// ---------------------------------------------------------------------------
// Compiled candidates
// ---------------------------------------------------------------------------

/// Screening columns compiled over any number of candidate archives,
/// independent of rendering.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Absolute time (MJD seconds).
    pub times: Vec<f64>,
    /// dt trial index.
    pub dts: Vec<i64>,
    /// DM value (pc/cm3).
    pub dms: Vec<f64>,
    pub snrs: Vec<f64>,
    /// Sky offsets (radians); empty when the archives carry no l/m features.
    pub l1s: Vec<f64>,
    pub m1s: Vec<f64>,
}

/// A compiled set plus the metadata of the last archive read.
#[derive(Debug, Clone)]
pub struct CompiledCands {
    pub state: ArchiveState,
    pub cands: CandidateSet,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn has_offsets(&self) -> bool {
        !self.l1s.is_empty() && self.l1s.len() == self.len()
    }

    /// Rows with positive SNR.
    pub fn positive(&self) -> CandidateSet {
        self.subset(&positive_indices(&self.snrs))
    }

    pub fn subset(&self, indices: &[usize]) -> CandidateSet {
        let offsets = self.has_offsets();
        CandidateSet {
            times: select(&self.times, indices),
            dts: select(&self.dts, indices),
            dms: select(&self.dms, indices),
            snrs: select(&self.snrs, indices),
            l1s: if offsets { select(&self.l1s, indices) } else { Vec::new() },
            m1s: if offsets { select(&self.m1s, indices) } else { Vec::new() },
        }
    }

    /// Load `paths` and append their candidates.
    ///
    /// `snr_column` plus the `dtind`/`dmind` axes are required; l/m columns are
    /// optional and dropped for every archive once one lacks them.
    pub fn compile(paths: &[PathBuf], config: &AnalysisConfig) -> Result<CompiledCands> {
        if paths.is_empty() {
            return Err(CandError::InvalidParameter("no candidate archives given".into()));
        }

        let mut set = CandidateSet::default();
        let mut offsets = true;
        let mut last_state = None;

        for path in paths {
            let archive = read_candidates(path)?;
            let state = archive.state;
            let snrcol = state.features.index_of(&config.snr_column)?;
            let dtcol = state.locations.index_of("dtind")?;
            let dmcol = state.locations.index_of("dmind")?;
            let lm = match (
                state.features.index_of(&config.l_column),
                state.features.index_of(&config.m_column),
            ) {
                (Ok(l), Ok(m)) => Some((l, m)),
                _ => None,
            };
            if lm.is_none() && offsets {
                warn!("{}: no sky offset features; skipping offsets", path.display());
                offsets = false;
                set.l1s.clear();
                set.m1s.clear();
            }

            let cands = &archive.candidates;
            if !cands.is_empty() {
                set.times.extend(absolute_times(&state, &cands.locations)?);
                set.dts.extend(cands.location_column(dtcol));
                for dmind in cands.location_column(dmcol) {
                    set.dms.push(state.dm(dmind)?);
                }
                set.snrs.extend(cands.feature_column(snrcol));
                if let (true, Some((l, m))) = (offsets, lm) {
                    set.l1s.extend(cands.feature_column(l));
                    set.m1s.extend(cands.feature_column(m));
                }
            }
            last_state = Some(state);
        }

        let state = last_state.ok_or_else(|| {
            CandError::InvalidParameter("no candidate archives given".into())
        })?;
        Ok(CompiledCands { state, cands: set })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> CandidateSet {
        CandidateSet {
            times: vec![1.0, 2.0, 3.0],
            dts: vec![0, 1, 0],
            dms: vec![0.0, 10.0, 20.0],
            snrs: vec![6.0, -6.5, 7.0],
            l1s: vec![0.1, 0.2, 0.3],
            m1s: vec![-0.1, -0.2, -0.3],
        }
    }

    #[test]
    fn test_positive_subset() {
        let pos = set().positive();
        assert_eq!(pos.len(), 2);
        assert_eq!(pos.times, vec![1.0, 3.0]);
        assert_eq!(pos.m1s, vec![-0.1, -0.3]);
    }

    #[test]
    fn test_subset_without_offsets() {
        let mut s = set();
        s.l1s.clear();
        s.m1s.clear();
        let sub = s.subset(&[2]);
        assert!(!sub.has_offsets());
        assert_eq!(sub.snrs, vec![7.0]);
    }

    #[test]
    fn test_compile_requires_paths() {
        assert!(matches!(
            CandidateSet::compile(&[], &AnalysisConfig::default()),
            Err(CandError::InvalidParameter(_))
        ));
    }
}
