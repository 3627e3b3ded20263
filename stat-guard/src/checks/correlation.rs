//! Collinearity checks among features and against the target (SG4xx).

use super::{bound, feature_columns};
use crate::core::{
    Check, CheckCategory, ColumnKind, ColumnRoles, DatasetView, Params, Requirements, Role, Severity,
    Violation,
};
use crate::prelude::*;
use crate::stats;
use serde_json::json;
use std::collections::BTreeMap;

/// Absolute correlation treated as a duplicated feature.
const SEVERE_CORRELATION: f64 = 0.99;

/// VIF above which collinearity is an error.
const SEVERE_VIF: f64 = 10.0;

/// Rows where both columns hold finite values.
fn paired(view: &DatasetView, left: &str, right: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let xs = view.numeric_values(left)?;
    let ys = view.numeric_values(right)?;
    Ok(xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .unzip())
}

/// SG401: pairs of features that move together.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighCorrelation;

impl Check for HighCorrelation {
    fn code(&self) -> &str {
        "SG401"
    }

    fn name(&self) -> &str {
        "High Correlation"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Correlation
    }

    fn description(&self) -> &str {
        "Detects highly correlated pairs of numeric features"
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_correlation"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_correlation = params.f64("max_correlation")?;
        let mut columns = feature_columns(view, roles, ColumnKind::Numeric);
        if columns.len() < 2 {
            return Ok(vec![]);
        }
        columns.sort_unstable();

        let mut violations = Vec::new();
        for (i, left) in columns.iter().enumerate() {
            for right in &columns[i + 1..] {
                let (xs, ys) = paired(view, left, right)?;
                let Some(r) = stats::pearson(&xs, &ys) else {
                    continue;
                };
                if r.abs() <= max_correlation {
                    continue;
                }
                let severity = if r.abs() > SEVERE_CORRELATION {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                violations.push(
                    self.violation(
                        severity,
                        format!("High correlation ({r:.3}) between '{left}' and '{right}'"),
                    )
                    .with_suggestion("Consider removing one variable or using dimensionality reduction")
                    .with_context("column1", *left)
                    .with_context("column2", *right)
                    .with_context("correlation", r)
                    .with_context("threshold", max_correlation),
                );
            }
        }
        Ok(violations)
    }
}

/// SG402: variance inflation among numeric features.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multicollinearity;

impl Check for Multicollinearity {
    fn code(&self) -> &str {
        "SG402"
    }

    fn name(&self) -> &str {
        "Multicollinearity"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Correlation
    }

    fn description(&self) -> &str {
        "Checks variance inflation factors of numeric features"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(3)
    }

    fn parameters(&self) -> &[&'static str] {
        &["vif_threshold"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let threshold = params.f64("vif_threshold")?;
        let names = feature_columns(view, roles, ColumnKind::Numeric);
        if names.len() < 2 {
            return Ok(vec![]);
        }

        let raw = names
            .iter()
            .map(|name| view.numeric_values(name))
            .collect::<Result<Vec<_>>>()?;
        let complete: Vec<usize> = (0..view.row_count())
            .filter(|row| raw.iter().all(|column| column[*row].is_some_and(f64::is_finite)))
            .collect();
        if complete.len() < 3 {
            return Ok(vec![]);
        }

        let mut kept = Vec::new();
        let mut columns = Vec::new();
        for (name, column) in names.iter().zip(&raw) {
            let values: Vec<f64> = complete.iter().filter_map(|row| column[*row]).collect();
            if stats::unique_count(&values) > 1 {
                kept.push(*name);
                columns.push(values);
            }
        }
        let Some(factors) = stats::variance_inflation_factors(&columns) else {
            return Ok(vec![]);
        };

        let mut violations = Vec::new();
        for (name, vif) in kept.iter().zip(factors) {
            if vif <= threshold {
                continue;
            }
            let severity = if vif > SEVERE_VIF {
                Severity::Error
            } else {
                Severity::Warning
            };
            violations.push(
                self.violation(severity, format!("High VIF ({vif:.2}) for '{name}'"))
                    .with_suggestion("Consider removing or combining correlated predictors")
                    .with_context("feature", *name)
                    .with_context("vif", vif)
                    .with_context("threshold", threshold)
                    .with_context("perfect_collinearity", vif.is_infinite()),
            );
        }
        Ok(violations)
    }
}

/// SG403: features with almost no linear relation to the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeakTargetCorrelation;

impl Check for WeakTargetCorrelation {
    fn code(&self) -> &str {
        "SG403"
    }

    fn name(&self) -> &str {
        "Weak Target Correlation"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Correlation
    }

    fn description(&self) -> &str {
        "Lists features with negligible correlation to the target"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_target_correlation"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_correlation = params.f64("min_target_correlation")?;
        let target = bound(roles, Role::Target, self.code())?;

        let mut weak = BTreeMap::new();
        for feature in feature_columns(view, roles, ColumnKind::Numeric) {
            let (xs, ys) = paired(view, feature, target)?;
            if let Some(r) = stats::pearson(&xs, &ys).filter(|r| r.abs() < min_correlation) {
                weak.insert(feature, r);
            }
        }
        if weak.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![self
            .violation(
                Severity::Info,
                format!("{} features have very low correlation with target", weak.len()),
            )
            .with_suggestion("Consider feature selection or engineering")
            .with_context("features", json!(weak))
            .with_context("threshold", min_correlation)])
    }
}
