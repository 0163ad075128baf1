//! Conversions between pickled Python values and plain Rust values.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_pickle::{DeOptions, Deserializer, HashableValue, SerOptions, Value};

use crate::error::{CandError, Result};

/// Decoder options shared by every archive reader.
///
/// Python 2 `str` is decoded to text. Instances of classes we cannot resolve
/// keep their restore state, so a numpy array or scalar arrives as its
/// `__setstate__` payload (see [`numpy_kind`]); any other stray global becomes
/// `None` instead of aborting the load.
fn options() -> DeOptions {
    DeOptions::new()
        .decode_strings()
        .keep_restore_state()
        .replace_unresolved_globals()
}

/// Sequential reader over the pickled records of one file.
pub struct RecordReader<'p> {
    path: &'p Path,
    de: Deserializer<BufReader<File>>,
}

impl<'p> RecordReader<'p> {
    pub fn open(path: &'p Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CandError::io(path, e))?;
        Ok(Self {
            path,
            de: Deserializer::new(BufReader::new(file), options()),
        })
    }

    /// Decode the next record; `what` names it in the error.
    pub fn next_record(&mut self, what: &str) -> Result<Value> {
        self.de
            .deserialize_value()
            .map_err(|e| CandError::corrupt(self.path, format!("{what}: {e}")))
    }
}

/// Write `records` back to back into a fresh file at `path`.
pub fn write_records(path: &Path, records: &[&Value]) -> Result<()> {
    let file = File::create(path).map_err(|e| CandError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for value in records {
        serde_pickle::value_to_writer(&mut writer, value, SerOptions::new())
            .map_err(|e| CandError::corrupt(path, format!("encoding record: {e}")))?;
    }
    writer.flush().map_err(|e| CandError::io(path, e))
}

// -- Value → Rust --

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::F64(v) => Some(*v),
        Value::I64(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::I64(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        // Integral floats are accepted for indices written by numpy.
        Value::F64(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

pub fn as_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bytes(b) => String::from_utf8(b.clone()).ok(),
        _ => None,
    }
}

/// Elements of a list or tuple.
pub fn as_seq(value: &Value) -> Option<&[Value]> {
    match value {
        Value::List(items) | Value::Tuple(items) => Some(items),
        _ => None,
    }
}

pub fn number_list(value: &Value) -> Option<Vec<f64>> {
    as_seq(value)?.iter().map(as_f64).collect()
}

pub fn string_list(value: &Value) -> Option<Vec<String>> {
    as_seq(value)?.iter().map(as_str).collect()
}

/// Integer tuple of a dictionary key. A bare integer is a 1-tuple.
pub fn key_tuple(key: &HashableValue) -> Option<Vec<i64>> {
    match key {
        HashableValue::Tuple(items) => items
            .iter()
            .map(|item| match item {
                HashableValue::I64(i) => Some(*i),
                HashableValue::Bool(b) => Some(i64::from(*b)),
                _ => None,
            })
            .collect(),
        HashableValue::I64(i) => Some(vec![*i]),
        _ => None,
    }
}

/// Short type name for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::None => "None",
        Value::Bool(_) => "bool",
        Value::I64(_) | Value::Int(_) => "int",
        Value::F64(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "str",
        Value::List(_) => "list",
        Value::Tuple(_) => "tuple",
        Value::Set(_) | Value::FrozenSet(_) => "set",
        Value::Dict(_) => "dict",
    }
}

/// Recognise the restore state of a numpy object.
///
/// An ndarray is `(version, shape, dtype_state, fortran, raw_bytes)` and a
/// scalar `(dtype_state, raw_bytes)`. The dtype's type code does not survive
/// decoding, so the raw bytes cannot be interpreted.
pub fn numpy_kind(value: &Value) -> Option<&'static str> {
    let Value::Tuple(items) = value else {
        return None;
    };
    let raw = |v: &Value| matches!(v, Value::Bytes(_) | Value::String(_));
    match items.as_slice() {
        [Value::I64(_), Value::Tuple(shape), Value::Tuple(_), Value::Bool(_), data]
            if raw(data) && shape.iter().all(|d| matches!(d, Value::I64(_))) =>
        {
            Some("numpy array")
        }
        [Value::Tuple(_), Value::Bytes(_)] => Some("numpy scalar"),
        _ => None,
    }
}

/// Look up a string key in a pickled dictionary.
pub fn dict_get<'a>(map: &'a BTreeMap<HashableValue, Value>, key: &str) -> Option<&'a Value> {
    map.get(&HashableValue::String(key.to_string()))
        .or_else(|| map.get(&HashableValue::Bytes(key.as_bytes().to_vec())))
}

// -- Rust → Value --

pub fn key_value(key: &[i64]) -> HashableValue {
    HashableValue::Tuple(key.iter().map(|&i| HashableValue::I64(i)).collect())
}

pub fn float_list(values: &[f64]) -> Value {
    Value::List(values.iter().map(|&v| Value::F64(v)).collect())
}

pub fn str_list(values: &[&str]) -> Value {
    Value::List(values.iter().map(|s| Value::String(s.to_string())).collect())
}
