//! Variance, shape and distributional assumption checks (SG2xx).

use super::{target_samples, ratio};
use crate::core::{
    Check, CheckCategory, ColumnRoles, DatasetView, Params, Requirements, Role, Severity, Violation,
};
use crate::prelude::*;
use crate::stats;
use serde_json::json;
use std::collections::BTreeMap;

const MIN_SKEWNESS_SAMPLE: usize = 10;
const SEVERE_SKEWNESS: f64 = 4.0;
const MIN_KURTOSIS_SAMPLE: usize = 20;
const MIN_NORMALITY_UNIQUE: usize = 4;
const MIN_NORMALITY_STD: f64 = 1e-8;
const MIN_LEVENE_GROUP: usize = 3;

/// SG201: a sample without variation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroVariance;

impl Check for ZeroVariance {
    fn code(&self) -> &str {
        "SG201"
    }

    fn name(&self) -> &str {
        "Zero Variance"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Checks for columns with no or minimal variation"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["variance_threshold"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let threshold = params.f64("variance_threshold")?;
        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            let Some(variance) = stats::variance(&values) else {
                continue;
            };
            let unique = stats::unique_count(&values);
            if unique <= 1 || variance < threshold {
                violations.push(
                    self.violation(
                        Severity::Error,
                        format!("Zero or near-zero variance in group '{group}' (var={variance:.2e})"),
                    )
                    .with_suggestion("Metric has no variability - check data collection or choose different metric")
                    .with_context("group", group)
                    .with_context("variance", variance)
                    .with_context("unique_values", unique),
                );
            }
        }
        Ok(violations)
    }
}

/// SG202: one value dominates the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearZeroVariance;

impl Check for NearZeroVariance {
    fn code(&self) -> &str {
        "SG202"
    }

    fn name(&self) -> &str {
        "Near-Zero Variance"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Detects columns where one value dominates"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["near_zero_variance_ratio"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let threshold = params.f64("near_zero_variance_ratio")?;
        let target = super::bound(roles, Role::Target, self.code())?;
        let values = stats::sorted(&view.present_numeric(target)?);
        if stats::unique_count(&values) <= 1 {
            return Ok(vec![]);
        }

        // Longest run of equal values in sorted order; first run wins ties.
        let mut dominant = (values[0], 0_usize);
        let mut run = (values[0], 0_usize);
        for value in &values {
            if *value == run.0 {
                run.1 += 1;
            } else {
                run = (*value, 1);
            }
            if run.1 > dominant.1 {
                dominant = run;
            }
        }

        let frequency = ratio(dominant.1, values.len());
        if frequency <= threshold {
            return Ok(vec![]);
        }
        Ok(vec![self
            .violation(
                Severity::Warning,
                format!("Near-zero variance: {:.1}% of values are {}", frequency * 100.0, dominant.0),
            )
            .with_suggestion("Check for imputed values, data quality issues, or consider removing this variable")
            .with_context("dominant_value", dominant.0)
            .with_context("frequency", frequency)
            .with_context("threshold", threshold)])
    }
}

/// SG203: asymmetric target distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Skewness;

impl Check for Skewness {
    fn code(&self) -> &str {
        "SG203"
    }

    fn name(&self) -> &str {
        "Skewness"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Checks for asymmetric distributions"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_skewness"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_skewness = params.f64("max_skewness")?;
        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            if values.len() < MIN_SKEWNESS_SAMPLE {
                continue;
            }
            let Some(skew) = stats::skewness(&values) else {
                continue;
            };
            if skew.abs() <= max_skewness {
                continue;
            }
            let severity = if skew.abs() > SEVERE_SKEWNESS {
                Severity::Error
            } else {
                Severity::Warning
            };
            violations.push(
                self.violation(severity, format!("High skewness ({skew:.2}) in group '{group}'"))
                    .with_suggestion("Mean may be misleading; consider median, log-transform, or non-parametric tests")
                    .with_context("group", group)
                    .with_context("skewness", skew)
                    .with_context("threshold", max_skewness)
                    .with_context("direction", if skew > 0.0 { "right" } else { "left" }),
            );
        }
        Ok(violations)
    }
}

/// SG204: unusually heavy or light tails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kurtosis;

impl Check for Kurtosis {
    fn code(&self) -> &str {
        "SG204"
    }

    fn name(&self) -> &str {
        "Kurtosis"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Checks for unusual tail behavior in distributions"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_kurtosis"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_kurtosis = params.f64("max_kurtosis")?;
        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            if values.len() < MIN_KURTOSIS_SAMPLE {
                continue;
            }
            let Some(kurtosis) = stats::excess_kurtosis(&values) else {
                continue;
            };
            if kurtosis.abs() <= max_kurtosis {
                continue;
            }
            let interpretation = if kurtosis > 0.0 {
                "heavy_tailed"
            } else {
                "light_tailed"
            };
            violations.push(
                self.violation(Severity::Warning, format!("High kurtosis ({kurtosis:.2}) in group '{group}'"))
                    .with_suggestion("Distribution has heavy tails; consider robust methods or outlier treatment")
                    .with_context("group", group)
                    .with_context("kurtosis", kurtosis)
                    .with_context("threshold", max_kurtosis)
                    .with_context("interpretation", interpretation),
            );
        }
        Ok(violations)
    }
}

/// Evenly spaced subsample of at most `max` values, keeping row order.
fn evenly_spaced(values: &[f64], max: usize) -> Vec<f64> {
    if values.len() <= max || max == 0 {
        return values.to_vec();
    }
    (0..max).map(|i| values[i * values.len() / max]).collect()
}

/// SG205: Shapiro-Wilk normality per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normality;

impl Check for Normality {
    fn code(&self) -> &str {
        "SG205"
    }

    fn name(&self) -> &str {
        "Normality"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Tests if data follows a normal distribution"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["normality_alpha", "min_shapiro_sample", "max_shapiro_sample"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let alpha = params.f64("normality_alpha")?;
        let min_sample = params.usize("min_shapiro_sample")?;
        let max_sample = params.usize("max_shapiro_sample")?.min(stats::SHAPIRO_MAX_N);

        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            if values.len() < min_sample
                || stats::unique_count(&values) < MIN_NORMALITY_UNIQUE
                || stats::std_dev(&values).is_none_or(|sd| sd < MIN_NORMALITY_STD)
            {
                continue;
            }
            let sample = evenly_spaced(&values, max_sample);
            let Some(result) = stats::shapiro_wilk(&sample) else {
                continue;
            };
            if !result.is_significant(alpha) {
                continue;
            }
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!(
                        "Non-normal distribution detected in group '{group}' (p={:.4})",
                        result.p_value
                    ),
                )
                .with_suggestion("Consider non-parametric tests or data transformation")
                .with_context("group", group)
                .with_context("p_value", result.p_value)
                .with_context("statistic", result.statistic)
                .with_context("alpha", alpha)
                .with_context("sample_size", values.len()),
            );
        }
        Ok(violations)
    }
}

/// SG206: unequal variances between groups (median-centred Levene test).
#[derive(Debug, Clone, Copy, Default)]
pub struct Heteroscedasticity;

impl Check for Heteroscedasticity {
    fn code(&self) -> &str {
        "SG206"
    }

    fn name(&self) -> &str {
        "Heteroscedasticity"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Distribution
    }

    fn description(&self) -> &str {
        "Tests for unequal variances between groups"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().min_groups(2)
    }

    fn parameters(&self) -> &[&'static str] {
        &["significance_level"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let alpha = params.f64("significance_level")?;
        let groups = target_samples(view, roles, self.code())?;
        if groups.len() < 2 || groups.iter().any(|(_, values)| values.len() < MIN_LEVENE_GROUP) {
            return Ok(vec![]);
        }

        let samples: Vec<&[f64]> = groups.iter().map(|(_, values)| values.as_slice()).collect();
        let Some(result) = stats::levene(&samples) else {
            return Ok(vec![]);
        };
        if !result.is_significant(alpha) {
            return Ok(vec![]);
        }

        let variances: BTreeMap<&str, f64> = groups
            .iter()
            .filter_map(|(group, values)| Some((group.as_str(), stats::variance(values)?)))
            .collect();
        let largest = variances.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let smallest = variances.values().copied().fold(f64::INFINITY, f64::min);
        let variance_ratio = if smallest > 0.0 {
            largest / smallest
        } else {
            f64::INFINITY
        };

        Ok(vec![self
            .violation(
                Severity::Warning,
                format!("Heteroscedasticity detected (p={:.4})", result.p_value),
            )
            .with_suggestion("Consider Welch's t-test or variance-stabilizing transformation")
            .with_context("p_value", result.p_value)
            .with_context("statistic", result.statistic)
            .with_context("group_variances", json!(variances))
            .with_context("variance_ratio", variance_ratio)])
    }
}
