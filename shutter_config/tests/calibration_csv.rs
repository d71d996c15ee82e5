use std::fs::File;
use std::io::Write;

use rstest::rstest;
use shutter_config::{CalibrationRow, CalibrationTable, load_calibration_csv};
use tempfile::tempdir;

fn row(name: &str, open: f64, close: f64) -> CalibrationRow {
    CalibrationRow {
        name: name.into(),
        time_to_open: open,
        time_to_close: close,
    }
}

#[rstest]
fn table_looks_up_by_trimmed_name() {
    let t = CalibrationTable::from_rows(vec![
        row("Living room", 20.0, 18.5),
        row(" Bedroom ", 31.2, 29.9),
    ])
    .unwrap();
    assert_eq!(t.len(), 2);
    let bed = t.get("Bedroom").expect("bedroom row");
    assert!((bed.time_to_open - 31.2).abs() < 1e-9);
    assert!(t.get("Kitchen").is_none());
}

#[rstest]
fn table_rejects_duplicate_names() {
    let err = CalibrationTable::from_rows(vec![row("a", 1.0, 1.0), row("a", 2.0, 2.0)])
        .unwrap_err();
    assert!(format!("{err}").contains("more than once"));
}

#[rstest]
#[case(0.0, 10.0)]
#[case(10.0, -1.0)]
#[case(f64::INFINITY, 10.0)]
fn table_rejects_non_positive_times(#[case] open: f64, #[case] close: f64) {
    assert!(CalibrationTable::from_rows(vec![row("a", open, close)]).is_err());
}

#[rstest]
fn table_rejects_empty_input() {
    assert!(CalibrationTable::from_rows(Vec::new()).is_err());
}

#[rstest]
fn load_csv_happy_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "name,time_to_open,time_to_close").unwrap();
    writeln!(f, "Living room, 20.0, 18.5").unwrap();
    writeln!(f, "Bedroom,31.2,29.9").unwrap();
    drop(f);

    let t = load_calibration_csv(&path).unwrap();
    let lr = t.get("Living room").unwrap();
    assert!((lr.time_to_close - 18.5).abs() < 1e-9);
}

#[rstest]
fn load_csv_rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(&path, "cover,open,close\nx,1.0,1.0\n").unwrap();
    let err = load_calibration_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("must have headers"));
}

#[rstest]
fn load_csv_reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(
        &path,
        "name,time_to_open,time_to_close\nok,1.0,1.0\nbad,fast,1.0\n",
    )
    .unwrap();
    let err = load_calibration_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 3"), "got: {err}");
}

#[rstest]
fn load_csv_missing_file_mentions_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");
    let err = load_calibration_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("nope.csv"));
}
