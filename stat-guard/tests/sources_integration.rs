//! CSV files through validation, profiling and comparison.

use stat_guard::analyzers::{Comparator, ProfileOptions};
use stat_guard::api;
use stat_guard::core::ColumnKind;
use stat_guard::sources::{CsvOptions, CsvSource, DataSource};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_experiment(dir: &Path, name: &str, rows: usize, shift: f64) -> PathBuf {
    let mut csv = String::from("user_id,arm,revenue,sessions\n");
    for i in 0..rows {
        let arm = if i % 2 == 0 { "control" } else { "treatment" };
        let revenue = shift + 20.0 + ((i * 37) % 41) as f64;
        let sessions = if i % 25 == 0 {
            "NA".to_string()
        } else {
            (1 + (i * 7) % 9).to_string()
        };
        writeln!(csv, "{},{arm},{revenue},{sessions}", 1000 + i).unwrap();
    }
    let path = dir.join(name);
    std::fs::write(&path, csv).unwrap();
    path
}

fn identifiers() -> CsvOptions {
    CsvOptions {
        identifier_columns: vec!["user_id".to_string()],
        ..CsvOptions::default()
    }
}

#[test]
fn test_csv_experiment_validates() {
    let dir = TempDir::new().unwrap();
    let path = write_experiment(dir.path(), "experiment.csv", 200, 0.0);
    let view = CsvSource::with_options(&path, identifiers()).load().unwrap();

    assert_eq!(view.row_count(), 200);
    assert_eq!(view.column_kind("user_id").unwrap(), ColumnKind::Identifier);
    assert_eq!(view.null_count("sessions").unwrap(), 8);

    let report = api::validate(&view, "revenue", Some("arm"), Some("user_id"), "lenient", false).unwrap();
    assert!(!report.has_violation_code("SG301"));
    assert!(!report.has_violation_code("SG101"));
    assert_eq!(report.metadata().n_rows, 200);
}

#[test]
fn test_csv_profile() {
    let dir = TempDir::new().unwrap();
    let path = write_experiment(dir.path(), "experiment.csv", 100, 0.0);
    let view = CsvSource::with_options(&path, identifiers()).load().unwrap();

    let profile = api::profile(&view, ProfileOptions::default()).unwrap();
    assert_eq!(profile.n_rows, 100);
    assert_eq!(profile.n_columns, 4);
    assert_eq!(profile.total_missing_cells, 4);

    let sessions = profile.column("sessions").unwrap();
    assert_eq!(sessions.missing_count, 4);
    assert!(sessions.numeric.is_some());

    let arm = profile.column("arm").unwrap();
    assert_eq!(arm.unique_count, 2);
    assert_eq!(arm.top_categories.as_ref().unwrap().len(), 2);

    let json: serde_json::Value = serde_json::from_str(&profile.to_json().unwrap()).unwrap();
    assert_eq!(json["n_rows"], 100);
}

#[test]
fn test_csv_compare_detects_shift() {
    let dir = TempDir::new().unwrap();
    let train = write_experiment(dir.path(), "train.csv", 200, 0.0);
    let same = write_experiment(dir.path(), "same.csv", 200, 0.0);
    let shifted = write_experiment(dir.path(), "shifted.csv", 200, 15.0);

    let train = CsvSource::new(&train).load().unwrap();
    let same = CsvSource::new(&same).load().unwrap();
    let shifted = CsvSource::new(&shifted).load().unwrap();

    assert!(!api::compare(&train, &same, "revenue").unwrap().drift_detected);
    let result = Comparator::new().alpha(0.01).compare(&train, &shifted, "revenue").unwrap();
    assert!(result.drift_detected);
    assert!(result.t_test.unwrap().significant);
    assert_eq!(result.shape_a, (200, 4));
}

#[test]
fn test_csv_compare_rejects_categorical_target() {
    let dir = TempDir::new().unwrap();
    let path = write_experiment(dir.path(), "experiment.csv", 20, 0.0);
    let view = CsvSource::new(&path).load().unwrap();

    let err = api::compare(&view, &view, "arm").unwrap_err();
    assert!(err.is_configuration());
}
