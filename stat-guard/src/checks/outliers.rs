//! Outlier and value bound checks (SG5xx).

use super::{bound, ratio, target_samples};
use crate::core::{
    Check, CheckCategory, ColumnRoles, DatasetView, Params, Requirements, Role, Severity, Violation,
};
use crate::prelude::*;
use crate::stats;
use serde_json::json;

const MIN_OUTLIER_SAMPLE: usize = 10;
const SEVERE_OUTLIER_PCT: f64 = 0.15;
const MIN_CLUSTER_SIZE: usize = 5;
const MIN_WINSORIZE_SAMPLE: usize = 100;
const EXAMPLE_LIMIT: usize = 5;

/// Scale factor turning a median absolute deviation into a robust z-score.
const MAD_SCALE: f64 = 0.6745;

/// How outliers are told apart from regular values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMethod {
    /// Outside `[q1 - k * iqr, q3 + k * iqr]`
    Iqr,
    /// Absolute z-score (population sd) above `k`
    ZScore,
    /// Absolute modified z-score `0.6745 * (x - median) / mad` above `k`
    Mad,
}

impl OutlierMethod {
    /// Parses the `outlier_method` parameter.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" => Ok(OutlierMethod::ZScore),
            "mad" => Ok(OutlierMethod::Mad),
            other => Err(StatGuardError::invalid_parameter(
                "outlier_method",
                "one of iqr, zscore, mad",
                other,
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::ZScore => "zscore",
            OutlierMethod::Mad => "mad",
        }
    }

    /// Flags each value as outlier or not. Degenerate spreads flag nothing.
    pub fn detect(&self, values: &[f64], threshold: f64) -> Vec<bool> {
        let none = || vec![false; values.len()];
        match self {
            OutlierMethod::Iqr => {
                let Some((lower, upper)) = iqr_fences(values, threshold) else {
                    return none();
                };
                values.iter().map(|v| *v < lower || *v > upper).collect()
            }
            OutlierMethod::ZScore => {
                let (Some(mean), Some(variance)) = (stats::mean(values), stats::variance(values)) else {
                    return none();
                };
                let n = values.len() as f64;
                let sd = (variance * (n - 1.0) / n).sqrt();
                if sd <= 0.0 {
                    return none();
                }
                values.iter().map(|v| ((v - mean) / sd).abs() > threshold).collect()
            }
            OutlierMethod::Mad => {
                let Some(median) = stats::median(values) else {
                    return none();
                };
                let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
                let mad = stats::median(&deviations).unwrap_or(0.0);
                if mad == 0.0 {
                    return none();
                }
                values
                    .iter()
                    .map(|v| (MAD_SCALE * (v - median) / mad).abs() > threshold)
                    .collect()
            }
        }
    }
}

/// Tukey fences `q1 - k * iqr` and `q3 + k * iqr`.
fn iqr_fences(values: &[f64], k: f64) -> Option<(f64, f64)> {
    let sorted = stats::sorted(values);
    let q1 = stats::quantile_sorted(&sorted, 0.25)?;
    let q3 = stats::quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - k * iqr, q3 + k * iqr))
}

fn flagged(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, outlier)| **outlier)
        .map(|(value, _)| *value)
        .collect()
}

/// SG501: share of outliers per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outliers;

impl Check for Outliers {
    fn code(&self) -> &str {
        "SG501"
    }

    fn name(&self) -> &str {
        "Outlier Detection"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Outliers
    }

    fn description(&self) -> &str {
        "Detects extreme values that may indicate errors or anomalies"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["outlier_method", "outlier_threshold", "max_outlier_pct"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let method = OutlierMethod::parse(params.str("outlier_method")?)?;
        let threshold = params.f64("outlier_threshold")?;
        let max_pct = params.f64("max_outlier_pct")?;

        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            if values.len() < MIN_OUTLIER_SAMPLE {
                continue;
            }
            let outliers = flagged(&values, &method.detect(&values, threshold));
            let pct = ratio(outliers.len(), values.len());
            if outliers.is_empty() {
                continue;
            }

            if pct > max_pct {
                let severity = if pct > SEVERE_OUTLIER_PCT {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                let low = outliers.iter().copied().fold(f64::INFINITY, f64::min);
                let high = outliers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                violations.push(
                    self.violation(
                        severity,
                        format!("High outlier percentage ({:.1}%) in group '{group}'", pct * 100.0),
                    )
                    .with_suggestion("Review outliers for data errors or consider robust methods")
                    .with_context("group", group)
                    .with_context("outlier_count", outliers.len())
                    .with_context("outlier_percentage", pct * 100.0)
                    .with_context("threshold_percentage", max_pct * 100.0)
                    .with_context("method", method.as_str())
                    .with_context("outlier_range", json!({ "min": low, "max": high })),
                );
            } else {
                violations.push(
                    self.violation(
                        Severity::Info,
                        format!("Moderate outliers detected ({:.1}%) in group '{group}'", pct * 100.0),
                    )
                    .with_suggestion("Review if outliers are valid data points")
                    .with_context("group", group)
                    .with_context("outlier_count", outliers.len())
                    .with_context("outlier_percentage", pct * 100.0)
                    .with_context("method", method.as_str()),
                );
            }
        }
        Ok(violations)
    }
}

/// SG502: values beyond the winsorising quantiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Winsorization;

impl Check for Winsorization {
    fn code(&self) -> &str {
        "SG502"
    }

    fn name(&self) -> &str {
        "Winsorization Recommendation"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Outliers
    }

    fn description(&self) -> &str {
        "Suggests winsorization for datasets with extreme values"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().min_rows(MIN_WINSORIZE_SAMPLE)
    }

    fn parameters(&self) -> &[&'static str] {
        &["winsorize_threshold"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let level = params.f64("winsorize_threshold")?;
        if !(level > 0.0 && level < 0.5) {
            return Err(StatGuardError::invalid_parameter(
                "winsorize_threshold",
                "a tail share in (0, 0.5)",
                level.to_string(),
            ));
        }
        let target = bound(roles, Role::Target, self.code())?;
        let sorted = stats::sorted(&view.present_numeric(target)?);
        if sorted.len() < MIN_WINSORIZE_SAMPLE {
            return Ok(vec![]);
        }

        let quantile = |q: f64| stats::quantile_sorted(&sorted, q).unwrap_or_default();
        let iqr = quantile(0.75) - quantile(0.25);
        if iqr <= 0.0 {
            return Ok(vec![]);
        }
        let (lower, upper) = (quantile(level), quantile(1.0 - level));
        let below = sorted.iter().filter(|v| **v < lower).count();
        let above = sorted.iter().filter(|v| **v > upper).count();
        if below == 0 && above == 0 {
            return Ok(vec![]);
        }

        Ok(vec![self
            .violation(
                Severity::Info,
                format!("Consider winsorization at {:.1}% level", level * 100.0),
            )
            .with_suggestion("Winsorization can reduce the impact of extreme values")
            .with_context("lower_extreme_count", below)
            .with_context("upper_extreme_count", above)
            .with_context("winsorize_threshold", level)
            .with_context("lower_value", lower)
            .with_context("upper_value", upper)])
    }
}

/// SG503: outliers sitting entirely on one side of the median.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlierCluster;

impl Check for OutlierCluster {
    fn code(&self) -> &str {
        "SG503"
    }

    fn name(&self) -> &str {
        "Outlier Cluster"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Outliers
    }

    fn description(&self) -> &str {
        "Detects outliers concentrated on one side of the distribution"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["flag_outlier_clusters", "outlier_method", "outlier_threshold"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        if !params.bool("flag_outlier_clusters")? {
            return Ok(vec![]);
        }
        let method = OutlierMethod::parse(params.str("outlier_method")?)?;
        let threshold = params.f64("outlier_threshold")?;

        let mut violations = Vec::new();
        for (group, values) in target_samples(view, roles, self.code())? {
            if values.len() < MIN_OUTLIER_SAMPLE {
                continue;
            }
            let outliers = flagged(&values, &method.detect(&values, threshold));
            if outliers.len() < MIN_CLUSTER_SIZE {
                continue;
            }
            let Some(median) = stats::median(&values) else {
                continue;
            };
            let lower = outliers.iter().filter(|v| **v < median).count();
            let side = match (lower, outliers.len() - lower) {
                (0, _) => "upper",
                (_, 0) => "lower",
                _ => continue,
            };
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!("All outliers are on the {side} side in group '{group}'"),
                )
                .with_suggestion("Check for one-sided data collection issues or censoring")
                .with_context("group", group)
                .with_context("side", side)
                .with_context("outlier_count", outliers.len())
                .with_context("method", method.as_str()),
            );
        }
        Ok(violations)
    }
}

/// SG504: values outside configured domain bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtremeValues;

impl ExtremeValues {
    fn report(&self, values: &[f64], bound: f64, side: &str) -> Violation {
        let examples: Vec<f64> = values.iter().copied().take(EXAMPLE_LIMIT).collect();
        let (extreme_key, extreme) = if side == "lower" {
            ("min_value", values.iter().copied().fold(f64::INFINITY, f64::min))
        } else {
            ("max_value", values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        };
        let direction = if side == "lower" { "below" } else { "above" };
        self.violation(
            Severity::Error,
            format!("{} values {direction} {side} bound ({bound})", values.len()),
        )
        .with_suggestion("Check for data entry errors or incorrect units")
        .with_context("count", values.len())
        .with_context(format!("{side}_bound"), bound)
        .with_context(extreme_key, extreme)
        .with_context("examples", json!(examples))
    }
}

impl Check for ExtremeValues {
    fn code(&self) -> &str {
        "SG504"
    }

    fn name(&self) -> &str {
        "Extreme Values"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Outliers
    }

    fn description(&self) -> &str {
        "Validates values against domain-specific thresholds"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target()
    }

    fn parameters(&self) -> &[&'static str] {
        &["lower_bound", "upper_bound"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let lower = params.opt_f64("lower_bound")?;
        let upper = params.opt_f64("upper_bound")?;
        if lower.is_none() && upper.is_none() {
            return Ok(vec![]);
        }
        let target = bound(roles, Role::Target, self.code())?;
        let values = view.present_numeric(target)?;

        let mut violations = Vec::new();
        if let Some(lower) = lower {
            let below: Vec<f64> = values.iter().copied().filter(|v| *v < lower).collect();
            if !below.is_empty() {
                violations.push(self.report(&below, lower, "lower"));
            }
        }
        if let Some(upper) = upper {
            let above: Vec<f64> = values.iter().copied().filter(|v| *v > upper).collect();
            if !above.is_empty() {
                violations.push(self.report(&above, upper, "upper"));
            }
        }
        Ok(violations)
    }
}
