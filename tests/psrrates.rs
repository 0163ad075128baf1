mod common;

use rtcands::analysis::psrrates::{make_psrrates, typical_ratios, DurationMode, RateCurveOptions};
use rtcands::{CandError, ColumnKind};
use tempfile::tempdir;

use common::{pulses, state, write_cands};

fn options(nbins: usize) -> RateCurveOptions {
    RateCurveOptions {
        nbins,
        ..RateCurveOptions::default()
    }
}

#[test]
fn rate_curves_from_archives() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let on = write_cands(dir.path(), "cands_on.pkl", &st, &pulses(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    let off = write_cands(dir.path(), "cands_off.pkl", &st, &pulses(&[0.5, 1.0, 1.5]));

    let curves = make_psrrates(&[on, off], &options(5)).unwrap();
    assert_eq!(curves.flux_column, "snr1");
    assert_eq!(curves.scans[0].len(), 5);
    assert_eq!(curves.scans[0].duration, 4.0);
    assert_eq!(curves.scans[1].duration, 2.0);

    let on = &curves.curves[&0];
    assert_eq!(on.rates, vec![0.25, 0.5, 0.75, 1.0, 1.25]);
    assert_eq!(on.fluxes, vec![5.0, 4.0, 3.0, 2.0, 1.0]);

    // 0.25/s over 2 s rounds to zero pulses and is dropped
    let off = &curves.curves[&1];
    assert_eq!(off.rates, vec![0.5, 0.75, 1.0, 1.25]);
    assert_eq!(off.fluxes, vec![1.5, 1.0, 1.0, 1.0]);

    assert_eq!(typical_ratios(&curves.curves), vec![(1, 1.0)]);
}

#[test]
fn flux_column_follows_priority() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1", "immax1"], &["segment", "int"]);
    let rows = vec![(vec![0, 0], vec![7.0, 0.7]), (vec![0, 1], vec![8.0, 0.8])];
    let path = write_cands(dir.path(), "cands_on.pkl", &st, &rows);

    let curves = make_psrrates(&[path], &options(2)).unwrap();
    assert_eq!(curves.flux_column, "immax1");
    assert_eq!(curves.scans[0].maxima, vec![0.7, 0.8]);
}

#[test]
fn empty_scan_gives_no_points() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let on = write_cands(dir.path(), "cands_on.pkl", &st, &pulses(&[1.0, 2.0, 3.0]));
    let off = write_cands(dir.path(), "cands_off.pkl", &st, &[]);

    let curves = make_psrrates(&[on, off], &options(3)).unwrap();
    assert_eq!(curves.scans[1].len(), 0);
    assert!(curves.curves[&1].is_empty());
    assert_eq!(curves.curves[&0].len(), 3);
}

#[test]
fn legacy_duration_mode() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let on = write_cands(dir.path(), "cands_on.pkl", &st, &pulses(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    let off1 = write_cands(dir.path(), "cands_off1.pkl", &st, &pulses(&[0.5, 1.0, 1.5]));
    let off2 = write_cands(dir.path(), "cands_off2.pkl", &st, &pulses(&[0.1, 0.2, 0.3, 0.4, 0.5]));

    let mut opts = options(5);
    opts.duration_mode = DurationMode::SecondScan;
    let curves = make_psrrates(&[on, off1, off2], &opts).unwrap();
    // scan 2 counts pulses over the 2 s of scan 1, so at most 2.5 → 2 pulses
    assert_eq!(curves.curves[&2].fluxes, vec![0.5, 0.4, 0.4, 0.4]);

    opts.duration_mode = DurationMode::PerScan;
    let dir2 = tempdir().unwrap();
    let on = write_cands(dir2.path(), "cands_on.pkl", &st, &pulses(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    let off2 = write_cands(dir2.path(), "cands_off2.pkl", &st, &pulses(&[0.1, 0.2, 0.3, 0.4, 0.5]));
    let curves = make_psrrates(&[on, off2], &opts).unwrap();
    assert_eq!(curves.curves[&1].fluxes, vec![0.5, 0.4, 0.3, 0.2, 0.1]);
}

#[test]
fn missing_flux_column() {
    let dir = tempdir().unwrap();
    let st = state(&["l1"], &["segment", "int"]);
    let path = write_cands(dir.path(), "cands_on.pkl", &st, &[(vec![0, 0], vec![0.0])]);

    match make_psrrates(&[path], &options(5)) {
        Err(CandError::MissingColumn { kind, name }) => {
            assert_eq!(kind, ColumnKind::Feature);
            assert_eq!(name, "immax2|immax1|snr1");
        }
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn rejects_bad_parameters() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1"], &["segment", "int"]);
    let path = write_cands(dir.path(), "cands_on.pkl", &st, &pulses(&[1.0]));

    let mut opts = options(0);
    assert!(matches!(
        make_psrrates(&[path.clone()], &opts),
        Err(CandError::InvalidParameter(_))
    ));
    opts.nbins = 5;
    opts.period = 0.0;
    assert!(matches!(
        make_psrrates(&[path], &opts),
        Err(CandError::InvalidParameter(_))
    ));
    assert!(matches!(
        make_psrrates(&[], &options(5)),
        Err(CandError::InvalidParameter(_))
    ));
}

#[test]
fn archive_wider_metadata_than_rows_is_corrupt() {
    let dir = tempdir().unwrap();
    let st = state(&["snr1", "immax1"], &["segment", "int"]);
    let path = write_cands(dir.path(), "cands_on.pkl", &st, &pulses(&[1.0, 2.0]));
    assert!(matches!(
        make_psrrates(&[path], &options(5)),
        Err(CandError::CorruptArchive { .. })
    ));

    let st = state(&["snr1"], &["dmind", "dtind", "segment", "int"]);
    let path = write_cands(dir.path(), "cands_keys.pkl", &st, &pulses(&[1.0, 2.0]));
    assert!(matches!(
        make_psrrates(&[path], &options(5)),
        Err(CandError::CorruptArchive { .. })
    ));
}
