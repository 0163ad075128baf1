#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_pickle::{HashableValue, Value};

use rtcands::data::pickle::{float_list, key_value, str_list, write_records};

/// Metadata record with the given columns, segments starting at MJD 0 and
/// one-second integrations.
pub fn state(features: &[&str], featureind: &[&str]) -> Value {
    let mut map = BTreeMap::new();
    let mut put = |k: &str, v: Value| {
        map.insert(HashableValue::String(k.to_string()), v);
    };
    put("features", str_list(features));
    put("featureind", str_list(featureind));
    put("dmarr", float_list(&[0.0, 50.0]));
    put("dtarr", float_list(&[1.0, 2.0]));
    put("segmenttimes", float_list(&[0.0, 0.0]));
    put("inttime", Value::F64(1.0));
    Value::Dict(map)
}

/// Write a candidate archive of `rows` under `dir/name`.
pub fn write_cands(
    dir: &Path,
    name: &str,
    state: &Value,
    rows: &[(Vec<i64>, Vec<f64>)],
) -> PathBuf {
    let cands: BTreeMap<HashableValue, Value> = rows
        .iter()
        .map(|(k, f)| (key_value(k), float_list(f)))
        .collect();
    let path = dir.join(name);
    write_records(&path, &[state, &Value::Dict(cands)]).unwrap();
    path
}

/// One detection per integration with `(segment, int)` keys.
pub fn pulses(fluxes: &[f64]) -> Vec<(Vec<i64>, Vec<f64>)> {
    fluxes
        .iter()
        .enumerate()
        .map(|(i, &f)| (vec![0, i as i64], vec![f]))
        .collect()
}
