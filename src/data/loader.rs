use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use serde_pickle::{HashableValue, Value};

use super::model::{ArchiveState, CandidateArchive, Candidates, ColumnRegistry, NoiseTable};
use super::pickle::{self, RecordReader};
use crate::error::{CandError, ColumnKind, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Both records of a candidate archive, undecoded.
///
/// Merging works on this form so that metadata and feature values are
/// written back exactly as they were read.
#[derive(Debug, Clone)]
pub struct RawArchive {
    pub state: Value,
    pub cands: BTreeMap<HashableValue, Value>,
}

/// Read the two records of a candidate archive without interpreting them.
///
/// Fails with `CorruptArchive` if either record does not decode or the second
/// one is not a mapping.
pub fn read_raw_archive(path: &Path) -> Result<RawArchive> {
    let mut reader = RecordReader::open(path)?;
    let state = reader.next_record("metadata record")?;
    let cands = match reader.next_record("candidate record")? {
        Value::Dict(map) => map,
        other => {
            return Err(CandError::corrupt(
                path,
                format!(
                    "candidate record is a {}, expected a mapping",
                    pickle::kind_name(&other)
                ),
            ))
        }
    };
    Ok(RawArchive { state, cands })
}

/// Load a candidate archive into sorted, aligned location and feature rows.
///
/// Zero candidates is a valid result and yields empty containers.
pub fn read_candidates(path: &Path) -> Result<CandidateArchive> {
    info!("Reading cands from {}...", path.display());
    let raw = read_raw_archive(path)?;
    let state = parse_state(path, &raw.state)?;
    let candidates = parse_candidates(path, &raw.cands)?;
    check_widths(path, &state, &candidates)?;

    if candidates.is_empty() {
        info!("No cands found.");
    } else {
        info!("Found {} candidates.", candidates.len());
    }
    Ok(CandidateArchive { state, candidates })
}

/// Location keys must have one entry per `featureind` axis and feature vectors
/// one entry per `features` name.
fn check_widths(path: &Path, state: &ArchiveState, candidates: &Candidates) -> Result<()> {
    let (Some(loc), Some(feat)) = (candidates.locations.first(), candidates.features.first()) else {
        return Ok(());
    };
    if loc.len() != state.locations.len() {
        return Err(CandError::corrupt(
            path,
            format!(
                "keys have {} axes but featureind names {}",
                loc.len(),
                state.locations.len()
            ),
        ));
    }
    if feat.len() != state.features.len() {
        return Err(CandError::corrupt(
            path,
            format!(
                "feature vectors have {} entries but features names {}",
                feat.len(),
                state.features.len()
            ),
        ));
    }
    Ok(())
}

/// Read only the metadata record of a candidate archive.
pub fn read_state(path: &Path) -> Result<ArchiveState> {
    let mut reader = RecordReader::open(path)?;
    let state = reader.next_record("metadata record")?;
    parse_state(path, &state)
}

/// Read a noise archive: one pickled list of
/// `(segment, noise-per-baseline, flagged-fraction, image-noise)` tuples.
pub fn read_noise(path: &Path) -> Result<NoiseTable> {
    let mut reader = RecordReader::open(path)?;
    let record = reader.next_record("noise record")?;
    parse_noise(path, &record)
}

// ---------------------------------------------------------------------------
// Record interpretation
// ---------------------------------------------------------------------------

/// Interpret a metadata record.
///
/// `features` and `featureind` must be lists of names. Other recognised keys
/// are optional, but a present key with an unusable value is corrupt.
pub fn parse_state(path: &Path, value: &Value) -> Result<ArchiveState> {
    let Value::Dict(map) = value else {
        return Err(CandError::corrupt(
            path,
            format!(
                "metadata record is a {}, expected a mapping",
                pickle::kind_name(value)
            ),
        ));
    };

    let field = |key: &str| state_field(path, map, key);

    let names = |key: &str| -> Result<Vec<String>> {
        field(key)?
            .and_then(pickle::string_list)
            .ok_or_else(|| CandError::corrupt(path, format!("'{key}' is not a list of names")))
    };
    let features = names("features")?;
    let featureind = names("featureind")?;

    let numbers = |key: &str| -> Result<Vec<f64>> {
        match field(key)? {
            None => Ok(Vec::new()),
            Some(v) => pickle::number_list(v)
                .ok_or_else(|| CandError::corrupt(path, format!("'{key}' is not a numeric list"))),
        }
    };
    let scalar = |key: &str| -> Result<Option<f64>> {
        match field(key)? {
            None => Ok(None),
            Some(v) => pickle::as_f64(v)
                .map(Some)
                .ok_or_else(|| CandError::corrupt(path, format!("'{key}' is not a number"))),
        }
    };
    let text = |key: &str| -> Result<Option<String>> { Ok(field(key)?.and_then(pickle::as_str)) };

    Ok(ArchiveState {
        source: path.to_path_buf(),
        features: ColumnRegistry::new(ColumnKind::Feature, features),
        locations: ColumnRegistry::new(ColumnKind::Location, featureind),
        dmarr: numbers("dmarr")?,
        dtarr: numbers("dtarr")?,
        segment_starts: segment_starts(path, field("segmenttimes")?)?,
        inttime: scalar("inttime")?,
        workdir: text("workdir")?.map(PathBuf::from),
        npixx: scalar("npixx")?,
        npixy: scalar("npixy")?,
        uvres: scalar("uvres")?,
        nints: scalar("nints")?,
        goodintcount: scalar("goodintcount")?,
    })
}

/// A metadata value that is present and not None. Numpy objects cannot be
/// decoded and are reported by name.
fn state_field<'a>(
    path: &Path,
    map: &'a BTreeMap<HashableValue, Value>,
    key: &str,
) -> Result<Option<&'a Value>> {
    match pickle::dict_get(map, key) {
        None | Some(Value::None) => Ok(None),
        Some(v) => match pickle::numpy_kind(v) {
            Some(kind) => Err(CandError::corrupt(
                path,
                format!("'{key}' holds an unsupported {kind}; expected plain lists and numbers"),
            )),
            None => Ok(Some(v)),
        },
    }
}

/// `segmenttimes` entries are either a start time or a `[start, stop]` pair.
fn segment_starts(path: &Path, value: Option<&Value>) -> Result<Vec<f64>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let bad = || CandError::corrupt(path, "'segmenttimes' is not a list of times");
    pickle::as_seq(value)
        .ok_or_else(bad)?
        .iter()
        .map(|entry| match pickle::as_seq(entry) {
            Some(pair) => pair.first().and_then(pickle::as_f64).ok_or_else(bad),
            None => pickle::as_f64(entry).ok_or_else(bad),
        })
        .collect()
}

/// Interpret the candidate mapping. Every key must be an integer tuple and every
/// value a numeric list, with one width per archive.
pub fn parse_candidates(path: &Path, cands: &BTreeMap<HashableValue, Value>) -> Result<Candidates> {
    let mut rows = Vec::with_capacity(cands.len());
    let mut widths: Option<(usize, usize)> = None;

    for (i, (key, value)) in cands.iter().enumerate() {
        let loc = pickle::key_tuple(key).ok_or_else(|| {
            CandError::corrupt(path, format!("candidate {i}: key is not an integer tuple"))
        })?;
        let feat = pickle::number_list(value).ok_or_else(|| {
            let numpy = pickle::as_seq(value).and_then(|items| items.iter().find_map(pickle::numpy_kind));
            let reason = match numpy {
                Some(kind) => format!("candidate {loc:?}: features hold an unsupported {kind}"),
                None => format!("candidate {loc:?}: features are not a numeric list"),
            };
            CandError::corrupt(path, reason)
        })?;

        match widths {
            None => widths = Some((loc.len(), feat.len())),
            Some((nloc, nfeat)) if nloc != loc.len() || nfeat != feat.len() => {
                return Err(CandError::corrupt(
                    path,
                    format!(
                        "candidate {loc:?}: {} axes / {} features, expected {nloc} / {nfeat}",
                        loc.len(),
                        feat.len()
                    ),
                ));
            }
            Some(_) => {}
        }
        rows.push((loc, feat));
    }

    Ok(Candidates::from_rows(rows))
}

fn parse_noise(path: &Path, record: &Value) -> Result<NoiseTable> {
    let entries = pickle::as_seq(record).ok_or_else(|| {
        CandError::corrupt(
            path,
            format!(
                "noise record is a {}, expected a list",
                pickle::kind_name(record)
            ),
        )
    })?;

    let mut table = NoiseTable::default();
    for (i, entry) in entries.iter().enumerate() {
        let fields = pickle::as_seq(entry)
            .filter(|f| f.len() == 4)
            .ok_or_else(|| CandError::corrupt(path, format!("noise entry {i} is not a 4-tuple")))?;
        let number = |j: usize| {
            pickle::as_f64(&fields[j]).ok_or_else(|| {
                CandError::corrupt(path, format!("noise entry {i}, field {j}: not a number"))
            })
        };
        let segment = pickle::as_i64(&fields[0]).ok_or_else(|| {
            CandError::corrupt(path, format!("noise entry {i}: segment is not an integer"))
        })?;

        table.segments.push(segment);
        table.noise_per_bl.push(number(1)?);
        table.flag_fraction.push(number(2)?);
        table.image_noise.push(number(3)?);
    }
    Ok(table)
}
