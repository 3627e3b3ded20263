//! Rendering and saving reports from real validation runs.

use arrow::array::{ArrayRef, Float64Array, StringArray};
use stat_guard::api;
use stat_guard::core::{DatasetView, Report};
use stat_guard::formatters::{FormatterConfig, HumanFormatter, JsonFormatter, ReportFormatter};
use std::sync::Arc;
use tempfile::TempDir;

fn failing_report() -> Report {
    let revenue: Vec<f64> = (0..12).map(|i| 10.0 + f64::from(i % 5)).collect();
    let arms: Vec<&str> = (0..12).map(|i| if i % 3 == 0 { "a" } else { "b" }).collect();
    let view = DatasetView::try_from_columns(vec![
        ("revenue", Arc::new(Float64Array::from(revenue)) as ArrayRef),
        ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
    ])
    .unwrap();
    api::validate(&view, "revenue", Some("arm"), None, "default", false).unwrap()
}

#[test]
fn test_save_by_extension() {
    let report = failing_report();
    let dir = TempDir::new().unwrap();

    for name in ["report.json", "report.md", "report.html", "report.txt"] {
        let path = dir.path().join(name);
        report.save(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("SG101"), "{name} lacks SG101");
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(json["is_valid"], false);
    assert_eq!(json["metadata"]["policy"], "default");
    assert!(json["violations"].as_array().unwrap().len() >= 1);

    let html = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    let markdown = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
    assert!(markdown.starts_with('#'));
}

#[test]
fn test_save_to_missing_directory_fails() {
    let report = failing_report();
    let dir = TempDir::new().unwrap();
    let err = report.save_json(dir.path().join("missing").join("report.json")).unwrap_err();
    assert!(err.to_string().contains("report.json"));
}

#[test]
fn test_json_round_trips_counts() {
    let report = failing_report();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    let summary = report.summary();
    assert_eq!(json["summary"]["error"], summary.error);
    assert_eq!(json["summary"]["warning"], summary.warning);
    assert_eq!(json["summary"]["info"], summary.info);
    assert_eq!(json["violations"].as_array().unwrap().len(), report.violations().len());
    assert!(!json["metadata"]["timestamp"].as_str().unwrap().is_empty());
}

#[test]
fn test_truncated_json_keeps_summary() {
    let report = failing_report();
    assert!(report.violations().len() > 1);

    let formatter = JsonFormatter::with_config(FormatterConfig::default().with_max_violations(1));
    let json: serde_json::Value = serde_json::from_str(&formatter.format(&report).unwrap()).unwrap();
    assert_eq!(json["violations"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["error"], report.summary().error);
}

#[test]
fn test_human_output_lists_every_violation() {
    let report = failing_report();
    let text = HumanFormatter::new().without_colors().format(&report).unwrap();

    assert!(text.contains("Validation FAILED"));
    assert!(!text.contains('\x1b'));
    for violation in report.violations() {
        assert!(text.contains(&format!("[{}]", violation.code)));
    }
}

#[test]
fn test_json_lists_non_numeric_target_skips() {
    let labels: Vec<&str> = (0..40).map(|i| ["bronze", "silver", "gold"][i % 3]).collect();
    let arms: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect();
    let view = DatasetView::try_from_columns(vec![
        ("tier", Arc::new(StringArray::from(labels)) as ArrayRef),
        ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
    ])
    .unwrap();
    let report = api::validate(&view, "tier", Some("arm"), None, "default", false).unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let skipped = json["checks_skipped"].as_array().unwrap();
    let sg201 = skipped.iter().find(|s| s["code"] == "SG201").unwrap();
    assert_eq!(sg201["reason"]["cause"], "non_numeric_target");
    assert_eq!(sg201["reason"]["column"], "tier");
    assert_eq!(sg201["reason"]["kind"], "categorical");
}
