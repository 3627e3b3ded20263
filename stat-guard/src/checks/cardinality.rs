//! Categorical level and identifier column checks (SG7xx).

use super::{feature_columns, ratio, unbound_columns};
use crate::core::{
    Check, CheckCategory, ColumnKind, ColumnRoles, DatasetView, Params, Requirements, Severity, Violation,
};
use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

static IDENTIFIER_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)(id|key)$|^(uuid|guid|index|row_number)$").expect("identifier pattern is valid")
});

/// Leading values inspected when deciding whether a column is sequential.
const SEQUENCE_SAMPLE: usize = 100;

/// Occurrences per level, counting nulls as a level of their own.
fn level_counts(view: &DatasetView, column: &str) -> Result<BTreeMap<Option<String>, usize>> {
    let mut counts = BTreeMap::new();
    for value in view.values(column)?.iter() {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// SG701: categorical columns with nearly one level per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighCardinality;

impl Check for HighCardinality {
    fn code(&self) -> &str {
        "SG701"
    }

    fn name(&self) -> &str {
        "High Cardinality"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Cardinality
    }

    fn description(&self) -> &str {
        "Flags categorical columns with almost as many levels as rows"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["flag_high_cardinality", "max_cardinality_ratio"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        if !params.bool("flag_high_cardinality")? {
            return Ok(vec![]);
        }
        let max_ratio = params.f64("max_cardinality_ratio")?;
        let total = view.row_count();

        let mut violations = Vec::new();
        for column in feature_columns(view, roles, ColumnKind::Categorical) {
            let unique = level_counts(view, column)?.len();
            let cardinality = ratio(unique, total);
            if cardinality <= max_ratio {
                continue;
            }
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!(
                        "High cardinality in '{column}' ({unique}/{total} = {:.1}%)",
                        cardinality * 100.0
                    ),
                )
                .with_suggestion("Column may be an identifier; consider excluding from analysis")
                .with_context("column", column)
                .with_context("unique_values", unique)
                .with_context("total_rows", total)
                .with_context("cardinality_ratio", cardinality)
                .with_context("threshold", max_ratio),
            );
        }
        Ok(violations)
    }
}

/// SG702: categorical columns with very few levels relative to rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowCardinality;

impl Check for LowCardinality {
    fn code(&self) -> &str {
        "SG702"
    }

    fn name(&self) -> &str {
        "Low Cardinality"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Cardinality
    }

    fn description(&self) -> &str {
        "Notes categorical columns with very few levels"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_cardinality_ratio"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_ratio = params.f64("min_cardinality_ratio")?;
        let total = view.row_count();

        let mut violations = Vec::new();
        for column in feature_columns(view, roles, ColumnKind::Categorical) {
            let unique = level_counts(view, column)?.len();
            let cardinality = ratio(unique, total);
            if unique <= 1 || cardinality >= min_ratio {
                continue;
            }
            violations.push(
                self.violation(
                    Severity::Info,
                    format!("Low cardinality in '{column}' ({unique} unique values)"),
                )
                .with_suggestion("Consider if this variable provides enough information")
                .with_context("column", column)
                .with_context("unique_values", unique)
                .with_context("cardinality_ratio", cardinality),
            );
        }
        Ok(violations)
    }
}

/// SG703: categorical levels seen only a handful of times.
#[derive(Debug, Clone, Copy, Default)]
pub struct RareCategories;

impl Check for RareCategories {
    fn code(&self) -> &str {
        "SG703"
    }

    fn name(&self) -> &str {
        "Rare Categories"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Cardinality
    }

    fn description(&self) -> &str {
        "Detects categorical levels with very few occurrences"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["rare_category_threshold"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let threshold = params.usize("rare_category_threshold")?;

        let mut violations = Vec::new();
        for column in feature_columns(view, roles, ColumnKind::Categorical) {
            let counts = level_counts(view, column)?;
            if counts.len() <= 1 {
                continue;
            }
            let rare: BTreeMap<String, usize> = counts
                .into_iter()
                .filter_map(|(level, count)| Some((level?, count)))
                .filter(|(_, count)| *count < threshold)
                .collect();
            if rare.is_empty() {
                continue;
            }
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!(
                        "{} rare categories in '{column}' (<{threshold} occurrences)",
                        rare.len()
                    ),
                )
                .with_suggestion("Consider combining rare categories or using regularization")
                .with_context("column", column)
                .with_context("rare_category_count", rare.len())
                .with_context("threshold", threshold)
                .with_context("rare_categories", json!(rare)),
            );
        }
        Ok(violations)
    }
}

/// SG704: columns without a single value.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyColumns;

impl Check for EmptyColumns {
    fn code(&self) -> &str {
        "SG704"
    }

    fn name(&self) -> &str {
        "Empty Columns"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Cardinality
    }

    fn description(&self) -> &str {
        "Detects columns that are entirely null"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn evaluate(&self, view: &DatasetView, _roles: &ColumnRoles, _params: &Params) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        for column in view.column_names() {
            let nulls = view.null_count(column)?;
            if nulls < view.row_count() {
                continue;
            }
            violations.push(
                self.violation(Severity::Error, format!("Column '{column}' is entirely null"))
                    .with_suggestion("Remove this column from analysis")
                    .with_context("column", column)
                    .with_context("null_count", nulls),
            );
        }
        Ok(violations)
    }
}

/// SG705: columns that look like row or entity identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierColumns;

impl IdentifierColumns {
    /// True when the leading values parse as numbers increasing by exactly one.
    fn is_sequential(values: &[Option<String>]) -> bool {
        let numbers: Vec<f64> = values
            .iter()
            .flatten()
            .take(SEQUENCE_SAMPLE)
            .filter_map(|value| value.trim().parse::<f64>().ok())
            .collect();
        numbers.len() >= 2 && numbers.windows(2).all(|pair| pair[1] - pair[0] == 1.0)
    }
}

impl Check for IdentifierColumns {
    fn code(&self) -> &str {
        "SG705"
    }

    fn name(&self) -> &str {
        "ID Column Detection"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Cardinality
    }

    fn description(&self) -> &str {
        "Detects potential ID columns that should be excluded from analysis"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(2)
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, _params: &Params) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        for column in unbound_columns(view, roles) {
            let values = view.values(column)?;
            let unique: BTreeSet<&Option<String>> = values.iter().collect();
            if unique.len() != view.row_count() {
                continue;
            }
            let sequential = Self::is_sequential(&values);
            if !sequential && !IDENTIFIER_NAME.is_match(column) {
                continue;
            }
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!("Column '{column}' appears to be an ID column (all unique values)"),
                )
                .with_suggestion("Exclude ID columns from statistical analysis")
                .with_context("column", column)
                .with_context("unique_values", unique.len())
                .with_context("pattern", if sequential { "sequential" } else { "random" }),
            );
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::core::Policy;

    fn run(check: &dyn Check, view: &DatasetView, roles: &ColumnRoles) -> Vec<Violation> {
        let params = Policy::default().params_for(check.parameters()).unwrap();
        check.evaluate(view, roles, &params).unwrap()
    }

    #[test]
    fn test_high_cardinality() {
        let names: Vec<String> = (0..40).map(|i| format!("user-{i}")).collect();
        let view = view(vec![
            ("name", labels(names.iter().map(|n| Some(n.as_str())).collect())),
            ("arm", labels(arms(40))),
        ]);
        let violations = run(&HighCardinality, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["column"], "name");
        assert_eq!(violations[0].context["cardinality_ratio"], 1.0);

        // Bound columns are not features.
        assert!(run(&HighCardinality, &view, &ColumnRoles::new().with_unit("name")).is_empty());
    }

    #[test]
    fn test_low_cardinality() {
        let view = view(vec![("arm", labels(arms(400)))]);
        let violations = run(&LowCardinality, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Info);
        assert_eq!(violations[0].context["unique_values"], 2);
    }

    #[test]
    fn test_rare_categories() {
        let mut levels = vec![Some("common"); 20];
        levels.extend([Some("rare"), Some("rare"), None]);
        let view = view(vec![("segment", labels(levels))]);
        let violations = run(&RareCategories, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["rare_categories"], json!({ "rare": 2 }));
    }

    #[test]
    fn test_empty_columns() {
        let view = view(vec![
            ("blank", floats(vec![None, None, None])),
            ("x", dense(&[1.0, 2.0, 3.0])),
        ]);
        let violations = run(&EmptyColumns, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_error());
        assert_eq!(violations[0].context["null_count"], 3);
    }

    #[test]
    fn test_identifier_columns() {
        let view = view(vec![
            ("row", ints((1..=10).collect())),
            ("customer_key", labels(vec![
                Some("k9"), Some("k3"), Some("k7"), Some("k1"), Some("k5"),
                Some("k2"), Some("k8"), Some("k4"), Some("k6"), Some("k0"),
            ])),
            ("score", dense(&[0.5, 0.1, 0.9, 0.3, 0.7, 0.2, 0.8, 0.4, 0.6, 0.0])),
        ]);
        let violations = run(&IdentifierColumns, &view, &ColumnRoles::new());
        let flagged: Vec<&str> = violations.iter().map(|v| v.context["column"].as_str().unwrap()).collect();
        assert_eq!(flagged, vec!["row", "customer_key"]);
        assert_eq!(violations[0].context["pattern"], "sequential");
        assert_eq!(violations[1].context["pattern"], "random");
    }

    #[test]
    fn test_identifier_name_pattern() {
        for name in ["user_id", "ID", "session_key", "uuid", "row_number"] {
            assert!(IDENTIFIER_NAME.is_match(name), "{name}");
        }
        for name in ["revenue", "identity_score", "keynote"] {
            assert!(!IDENTIFIER_NAME.is_match(name), "{name}");
        }
    }
}
