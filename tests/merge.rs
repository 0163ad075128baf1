mod common;

use rtcands::data::loader::{read_candidates, read_noise};
use rtcands::data::merge::{merge_archives, merge_cands};
use rtcands::data::pickle::write_records;
use rtcands::CandError;
use serde_pickle::Value;
use tempfile::tempdir;

use common::{state, write_cands};

#[test]
fn merge_takes_union_of_segments() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let a = write_cands(dir.path(), "cands_x_y_seg0.pkl", &st, &[(vec![0, 0], vec![1.0])]);
    let b = write_cands(dir.path(), "cands_x_y_seg1.pkl", &st, &[(vec![0, 1], vec![2.0])]);

    let out = merge_archives(&[a, b], None).unwrap();
    assert_eq!(out, dir.path().join("cands_x_y.pkl"));

    let merged = read_candidates(&out).unwrap();
    assert_eq!(merged.candidates.locations, vec![vec![0, 0], vec![0, 1]]);
    assert_eq!(merged.candidates.features, vec![vec![1.0], vec![2.0]]);
}

#[test]
fn merge_last_file_wins() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let a = write_cands(dir.path(), "cands_a.pkl", &st, &[(vec![0, 0], vec![1.0])]);
    let b = write_cands(dir.path(), "cands_b.pkl", &st, &[(vec![0, 0], vec![9.0])]);
    let out = dir.path().join("cands_out.pkl");

    assert_eq!(merge_cands(&[a, b], &out).unwrap(), 1);
    let merged = read_candidates(&out).unwrap();
    assert_eq!(merged.candidates.features, vec![vec![9.0]]);
}

#[test]
fn merge_rejects_different_columns() {
    let dir = tempdir().unwrap();
    let a = write_cands(
        dir.path(),
        "cands_a.pkl",
        &state(&["snr1"], &["segment", "int"]),
        &[(vec![0, 0], vec![1.0])],
    );
    let b = write_cands(
        dir.path(),
        "cands_b.pkl",
        &state(&["snr1", "immax1"], &["segment", "int"]),
        &[(vec![0, 1], vec![2.0, 0.1])],
    );

    let err = merge_cands(&[a, b.clone()], &dir.path().join("cands_out.pkl")).unwrap_err();
    match err {
        CandError::SchemaMismatch { path, .. } => assert_eq!(path, b),
        other => panic!("expected SchemaMismatch, got {other}"),
    }
}

#[test]
fn merge_concatenates_noise() {
    let dir = tempdir().unwrap();
    let entry = |seg: i64, im: f64| {
        Value::Tuple(vec![Value::I64(seg), Value::F64(0.1), Value::F64(0.0), Value::F64(im)])
    };
    let a = dir.path().join("noise_x_y_seg0.pkl");
    let b = dir.path().join("noise_x_y_seg1.pkl");
    write_records(&a, &[&Value::List(vec![entry(0, 0.01)])]).unwrap();
    write_records(&b, &[&Value::List(vec![entry(1, 0.02), entry(1, 0.03)])]).unwrap();

    let out = merge_archives(&[a, b], Some("all")).unwrap();
    assert_eq!(out, dir.path().join("noise_all.pkl"));
    let table = read_noise(&out).unwrap();
    assert_eq!(table.segments, vec![0, 1, 1]);
    assert_eq!(table.image_noise, vec![0.01, 0.02, 0.03]);
}

#[test]
fn merge_needs_recognisable_name() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let a = write_cands(dir.path(), "archive.pkl", &st, &[]);
    assert!(matches!(
        merge_archives(&[a], None),
        Err(CandError::InvalidParameter(_))
    ));
}
