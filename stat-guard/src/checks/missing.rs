//! Missing data checks (SG6xx).

use super::{bound, ratio};
use crate::core::{
    Check, CheckCategory, ColumnRoles, DatasetView, Params, Requirements, Role, Severity, Violation,
};
use crate::prelude::*;
use crate::stats;
use serde_json::json;
use std::collections::BTreeMap;

/// Spread of group missing rates that suggests systematic missingness.
const GROUP_MISSING_STD: f64 = 0.05;

/// Columns above this missing share are compared for shared masks.
const PATTERN_MISSING_PCT: f64 = 0.10;

/// Complete-case share below which listwise deletion is an error.
const MIN_COMPLETE_CASE_RATIO: f64 = 0.7;

/// Null mask of every column, in schema order.
fn null_masks(view: &DatasetView) -> Result<Vec<(&str, Vec<bool>)>> {
    let mut masks = Vec::with_capacity(view.column_count());
    for name in view.column_names() {
        masks.push((name, view.values(name)?.iter().map(Option::is_none).collect()));
    }
    Ok(masks)
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|missing| **missing).count()
}

/// SG601: overall and per-column missing shares.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcessiveMissing;

impl Check for ExcessiveMissing {
    fn code(&self) -> &str {
        "SG601"
    }

    fn name(&self) -> &str {
        "Excessive Missing Data"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::MissingData
    }

    fn description(&self) -> &str {
        "Checks overall and per-column missing value rates"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_missing_pct", "max_missing_pct_column"]
    }

    fn evaluate(&self, view: &DatasetView, _roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_overall = params.f64("max_missing_pct")?;
        let max_column = params.f64("max_missing_pct_column")?;
        let masks = null_masks(view)?;
        let rows = view.row_count();

        let mut violations = Vec::new();
        let missing: usize = masks.iter().map(|(_, mask)| count(mask)).sum();
        let overall = ratio(missing, rows * masks.len());
        if overall > max_overall {
            violations.push(
                self.violation(
                    Severity::Error,
                    format!(
                        "Overall missing data ({:.1}%) exceeds threshold ({:.1}%)",
                        overall * 100.0,
                        max_overall * 100.0
                    ),
                )
                .with_suggestion("Investigate missing data mechanism and consider imputation")
                .with_context("missing_pct", overall)
                .with_context("missing_cells", missing)
                .with_context("threshold", max_overall),
            );
        }

        let heavy: BTreeMap<&str, f64> = masks
            .iter()
            .map(|(name, mask)| (*name, ratio(count(mask), rows)))
            .filter(|(_, share)| *share > max_column)
            .collect();
        if !heavy.is_empty() {
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!(
                        "{} columns have >{:.0}% missing values",
                        heavy.len(),
                        max_column * 100.0
                    ),
                )
                .with_suggestion("Consider removing high-missing columns or using advanced imputation")
                .with_context("columns", json!(heavy))
                .with_context("threshold", max_column),
            );
        }
        Ok(violations)
    }
}

/// SG602: rows whose target is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingTarget;

impl Check for MissingTarget {
    fn code(&self) -> &str {
        "SG602"
    }

    fn name(&self) -> &str {
        "Target Missingness"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::MissingData
    }

    fn description(&self) -> &str {
        "Checks for missing values in the target variable"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Target)
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_missing_target_pct"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_pct = params.f64("max_missing_target_pct")?;
        let target = bound(roles, Role::Target, self.code())?;
        let missing = view.null_count(target)?;
        if missing == 0 {
            return Ok(vec![]);
        }

        let pct = ratio(missing, view.row_count());
        let severity = if pct > max_pct {
            Severity::Error
        } else {
            Severity::Warning
        };
        Ok(vec![self
            .violation(
                severity,
                format!("Target column has {missing} missing values ({:.1}%)", pct * 100.0),
            )
            .with_suggestion("Remove rows with missing targets or use imputation carefully")
            .with_context("missing_count", missing)
            .with_context("missing_percentage", pct * 100.0)
            .with_context("total_rows", view.row_count())])
    }
}

/// SG603: structure in where values are missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingPattern;

impl MissingPattern {
    fn by_group(&self, view: &DatasetView, masks: &[(&str, Vec<bool>)], group: &str) -> Result<Option<Violation>> {
        let labels = view.values(group)?;
        let columns: Vec<&Vec<bool>> = masks
            .iter()
            .filter(|(name, _)| *name != group)
            .map(|(_, mask)| mask)
            .collect();
        if columns.is_empty() {
            return Ok(None);
        }

        // label -> (missing cells, rows)
        let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for (row, label) in labels.iter().enumerate() {
            let Some(label) = label else { continue };
            let tally = tallies.entry(label.as_str()).or_default();
            tally.0 += columns.iter().filter(|mask| mask[row]).count();
            tally.1 += 1;
        }
        let rates: BTreeMap<&str, f64> = tallies
            .into_iter()
            .map(|(label, (missing, rows))| (label, ratio(missing, rows * columns.len())))
            .collect();
        let values: Vec<f64> = rates.values().copied().collect();
        let Some(spread) = stats::std_dev(&values) else {
            return Ok(None);
        };
        if spread <= GROUP_MISSING_STD {
            return Ok(None);
        }

        Ok(Some(
            self.violation(Severity::Warning, "Missing data rates vary significantly across groups")
                .with_suggestion("Investigate if missingness is related to group assignment")
                .with_context("missing_by_group", json!(rates))
                .with_context("std", spread),
        ))
    }
}

impl Check for MissingPattern {
    fn code(&self) -> &str {
        "SG603"
    }

    fn name(&self) -> &str {
        "Missing Pattern Analysis"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::MissingData
    }

    fn description(&self) -> &str {
        "Analyzes patterns and mechanisms of missing data"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["flag_missing_pattern"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let masks = null_masks(view)?;
        let mut violations = Vec::new();

        if let Some(group) = roles.group() {
            violations.extend(self.by_group(view, &masks, group)?);
        }

        if params.bool("flag_missing_pattern")? {
            let rows = view.row_count();
            let heavy: Vec<&(&str, Vec<bool>)> = masks
                .iter()
                .filter(|(_, mask)| ratio(count(mask), rows) > PATTERN_MISSING_PCT)
                .collect();
            for (i, (left, left_mask)) in heavy.iter().map(|entry| (entry.0, &entry.1)).enumerate() {
                for (right, right_mask) in heavy[i + 1..].iter().map(|entry| (entry.0, &entry.1)) {
                    if left_mask != right_mask {
                        continue;
                    }
                    violations.push(
                        self.violation(
                            Severity::Info,
                            format!("Columns '{left}' and '{right}' have identical missing patterns"),
                        )
                        .with_suggestion("These columns may be derived from the same source")
                        .with_context("column1", left)
                        .with_context("column2", right),
                    );
                }
            }
        }
        Ok(violations)
    }
}

/// SG604: rows lost to listwise deletion.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteCases;

impl Check for CompleteCases {
    fn code(&self) -> &str {
        "SG604"
    }

    fn name(&self) -> &str {
        "Complete Case Analysis"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::MissingData
    }

    fn description(&self) -> &str {
        "Evaluates impact of listwise deletion"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_complete_case_ratio"]
    }

    fn evaluate(&self, view: &DatasetView, _roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_ratio = params.f64("min_complete_case_ratio")?;
        let masks = null_masks(view)?;
        let total = view.row_count();
        let complete = (0..total)
            .filter(|row| masks.iter().all(|(_, mask)| !mask[*row]))
            .count();
        let retention = ratio(complete, total);

        let (severity, suggestion) = if retention < MIN_COMPLETE_CASE_RATIO {
            (
                Severity::Error,
                "Use multiple imputation or full information maximum likelihood",
            )
        } else if retention < min_ratio {
            (Severity::Warning, "Consider imputation methods to retain more data")
        } else {
            return Ok(vec![]);
        };

        let lost = total - complete;
        Ok(vec![self
            .violation(
                severity,
                format!(
                    "Complete case analysis would lose {lost} cases ({:.1}%)",
                    (1.0 - retention) * 100.0
                ),
            )
            .with_suggestion(suggestion)
            .with_context("complete_cases", complete)
            .with_context("total_cases", total)
            .with_context("cases_lost", lost)
            .with_context("retention_rate", retention)])
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

    /// Ten rows; `a` and `b` share a three-row gap, `c` is complete.
    fn gappy() -> DatasetView {
        let gaps = |value: f64| -> Vec<Option<f64>> {
            (0..10).map(|i| if i < 3 { None } else { Some(value + f64::from(i)) }).collect()
        };
        view(vec![
            ("a", floats(gaps(0.0))),
            ("b", floats(gaps(100.0))),
            ("c", dense(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0])),
        ])
    }

    #[test]
    fn test_excessive_missing() {
        let violations = run(&ExcessiveMissing, &gappy(), &ColumnRoles::new());
        assert_eq!(violations.len(), 2);
        assert!(violations[0].is_error());
        assert_eq!(violations[0].context["missing_cells"], 6);
        assert_eq!(violations[1].severity, Severity::Warning);
        assert_eq!(violations[1].context["columns"], json!({ "a": 0.3, "b": 0.3 }));
    }

    #[test]
    fn test_missing_target_severity() {
        let roles = ColumnRoles::new().with_target("a");
        let violations = run(&MissingTarget, &gappy(), &roles);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_error());
        assert_eq!(violations[0].context["missing_count"], 3);

        let mostly_present: Vec<Option<f64>> = (0..20).map(|i| if i == 0 { None } else { Some(1.0) }).collect();
        let view = view(vec![("a", floats(mostly_present))]);
        let violations = run(&MissingTarget, &view, &roles);
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn test_identical_missing_masks() {
        let violations = run(&MissingPattern, &gappy(), &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Info);
        assert_eq!(violations[0].context["column1"], "a");
        assert_eq!(violations[0].context["column2"], "b");
    }

    #[test]
    fn test_missing_rate_by_group() {
        let view = view(vec![
            ("x", floats(vec![None, None, None, Some(1.0), Some(2.0), Some(3.0)])),
            ("arm", labels(vec![Some("a"), Some("a"), Some("a"), Some("b"), Some("b"), Some("b")])),
        ]);
        let roles = ColumnRoles::new().with_group("arm");
        let violations = run(&MissingPattern, &view, &roles);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].context["missing_by_group"]["a"], 1.0);
    }

    #[test]
    fn test_complete_cases() {
        let violations = run(&CompleteCases, &gappy(), &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning, "70% is not below the error floor");

        let view = view(vec![("x", floats(vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)]))]);
        let violations = run(&CompleteCases, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].context["cases_lost"], 1);
    }
}
