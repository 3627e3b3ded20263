//! Sample size, power and group balance checks (SG1xx).

use super::{bound, two_samples};
use crate::core::{
    Check, CheckCategory, ColumnRoles, DatasetView, Params, Requirements, Role, Severity, Violation,
};
use crate::prelude::*;
use crate::stats;
use serde_json::json;
use std::collections::BTreeMap;

/// Effect size assumed by the power check when the groups have no spread.
const DEFAULT_EFFECT_SIZE: f64 = 0.2;

/// SMD above which covariate imbalance is an error.
const SEVERE_SMD: f64 = 0.5;

/// Non-null target count per group label, including labels whose target
/// values are all missing.
fn target_counts_by_group(view: &DatasetView, target: &str, group: &str) -> Result<BTreeMap<String, usize>> {
    let targets = view.values(target)?;
    let labels = view.values(group)?;
    let mut counts = BTreeMap::new();
    for (value, label) in targets.iter().zip(labels.iter()) {
        if let Some(label) = label {
            let count = counts.entry(label.clone()).or_insert(0);
            if value.is_some() {
                *count += 1;
            }
        }
    }
    Ok(counts)
}

/// SG101: the target has enough observations overall and per group.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumSampleSize;

impl Check for MinimumSampleSize {
    fn code(&self) -> &str {
        "SG101"
    }

    fn name(&self) -> &str {
        "Minimum Sample Size"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::SampleSize
    }

    fn description(&self) -> &str {
        "Checks if groups have sufficient observations for reliable analysis"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Target)
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_sample_size", "min_sample_size_per_group"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_total = params.usize("min_sample_size")?;
        let min_per_group = params.usize("min_sample_size_per_group")?;
        let target = bound(roles, Role::Target, self.code())?;

        let mut violations = Vec::new();
        let total = view.row_count() - view.null_count(target)?;
        if total < min_total {
            violations.push(
                self.violation(
                    Severity::Error,
                    format!("Total sample size ({total}) below minimum ({min_total})"),
                )
                .with_suggestion("Collect more data or use non-parametric methods")
                .with_context("actual", total)
                .with_context("required", min_total),
            );
        }

        if let Some(group) = roles.group() {
            for (label, count) in target_counts_by_group(view, target, group)? {
                if count >= min_per_group {
                    continue;
                }
                violations.push(
                    self.violation(
                        Severity::Warning,
                        format!("Group '{label}' has {count} observations, below minimum ({min_per_group})"),
                    )
                    .with_suggestion("Consider combining groups or collecting more data")
                    .with_context("group", label)
                    .with_context("actual", count)
                    .with_context("required", min_per_group),
                );
            }
        }

        Ok(violations)
    }
}

/// SG102: a two-group comparison has adequate power for the observed effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalPower;

impl Check for StatisticalPower {
    fn code(&self) -> &str {
        "SG102"
    }

    fn name(&self) -> &str {
        "Statistical Power"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::SampleSize
    }

    fn description(&self) -> &str {
        "Estimates if sample size provides adequate statistical power"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().exact_groups(2)
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_power", "significance_level"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_power = params.f64("min_power")?;
        let alpha = params.f64("significance_level")?;
        let Some([(_, first), (_, second)]) = two_samples(view, roles, self.code())? else {
            return Ok(vec![]);
        };
        if first.len() < 2 || second.len() < 2 {
            return Ok(vec![]);
        }

        let effect_size = stats::cohens_d(&first, &second).unwrap_or(DEFAULT_EFFECT_SIZE);
        let (n1, n2) = (first.len() as f64, second.len() as f64);
        let average = (n1 + n2) / 2.0;
        let power = stats::two_sample_power(effect_size, average, n2 / n1, alpha);

        if power >= min_power {
            return Ok(vec![]);
        }
        Ok(vec![self
            .violation(
                Severity::Warning,
                format!("Statistical power ({power:.2}) below threshold ({min_power})"),
            )
            .with_suggestion("Increase sample size or accept higher Type II error rate")
            .with_context("power", power)
            .with_context("required_power", min_power)
            .with_context("effect_size", effect_size)
            .with_context("sample_size", average.floor() as u64)])
    }
}

/// SG103: group sizes are within the allowed imbalance ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedGroups;

impl Check for BalancedGroups {
    fn code(&self) -> &str {
        "SG103"
    }

    fn name(&self) -> &str {
        "Balanced Groups"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::SampleSize
    }

    fn description(&self) -> &str {
        "Checks for significant imbalance between group sizes"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_groups(2)
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_imbalance_ratio"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_ratio = params.f64("max_imbalance_ratio")?;
        let group = bound(roles, Role::Group, self.code())?;
        let sizes = match roles.target() {
            Some(target) => target_counts_by_group(view, target, group)?,
            None => view.group_sizes(group)?,
        };

        let empty: Vec<&String> = sizes
            .iter()
            .filter(|(_, size)| **size == 0)
            .map(|(label, _)| label)
            .collect();
        if !empty.is_empty() {
            return Ok(vec![self
                .violation(Severity::Error, format!("Empty groups detected: {empty:?}"))
                .with_suggestion("Fix group assignment or filtering")
                .with_context("empty_groups", json!(empty))]);
        }

        let (Some(largest), Some(smallest)) = (sizes.values().max(), sizes.values().min()) else {
            return Ok(vec![]);
        };
        let ratio = *largest as f64 / *smallest as f64;
        if ratio <= max_ratio {
            return Ok(vec![]);
        }
        Ok(vec![self
            .violation(
                Severity::Warning,
                format!("Group imbalance ratio {ratio:.2} exceeds threshold {max_ratio}"),
            )
            .with_suggestion("Consider rebalancing, stratification, or weighted analysis")
            .with_context("ratio", ratio)
            .with_context("threshold", max_ratio)
            .with_context("group_sizes", json!(sizes))])
    }
}

/// SG104: the target's standardised mean difference between two groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct CovariateBalance;

impl Check for CovariateBalance {
    fn code(&self) -> &str {
        "SG104"
    }

    fn name(&self) -> &str {
        "Covariate Balance (SMD)"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::SampleSize
    }

    fn description(&self) -> &str {
        "Checks for covariate imbalance between groups using standardized mean difference"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().exact_groups(2)
    }

    fn parameters(&self) -> &[&'static str] {
        &["max_smd"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let max_smd = params.f64("max_smd")?;
        let Some([(first_label, first), (second_label, second)]) = two_samples(view, roles, self.code())? else {
            return Ok(vec![]);
        };
        let Some(smd) = stats::cohens_d(&first, &second) else {
            return Ok(vec![]);
        };
        if smd <= max_smd {
            return Ok(vec![]);
        }

        let severity = if smd > SEVERE_SMD {
            Severity::Error
        } else {
            Severity::Warning
        };
        Ok(vec![self
            .violation(
                severity,
                format!("SMD imbalance detected ({smd:.3}) between groups '{first_label}' and '{second_label}'"),
            )
            .with_suggestion("Consider stratification, matching, or rebalancing")
            .with_context("smd", smd)
            .with_context("threshold", max_smd)
            .with_context("group1", first_label)
            .with_context("group2", second_label)
            .with_context("group1_mean", stats::mean(&first))
            .with_context("group2_mean", stats::mean(&second))])
    }
}

/// SG105: flags a negligible observed effect between two groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectSize;

impl Check for EffectSize {
    fn code(&self) -> &str {
        "SG105"
    }

    fn name(&self) -> &str {
        "Effect Size"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::SampleSize
    }

    fn description(&self) -> &str {
        "Evaluates if observed effect size is practically meaningful"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().numeric_target().exact_groups(2)
    }

    fn parameters(&self) -> &[&'static str] {
        &["min_effect_size"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        let min_effect = params.f64("min_effect_size")?;
        let Some([(_, first), (_, second)]) = two_samples(view, roles, self.code())? else {
            return Ok(vec![]);
        };
        let Some(d) = stats::cohens_d(&first, &second) else {
            return Ok(vec![]);
        };
        if d >= min_effect {
            return Ok(vec![]);
        }
        Ok(vec![self
            .violation(Severity::Info, format!("Effect size (Cohen's d = {d:.3}) is very small"))
            .with_suggestion("Consider if this effect is practically meaningful")
            .with_context("cohens_d", d)
            .with_context("threshold", min_effect)
            .with_context("interpretation", stats::interpret_effect_size(d))])
    }
}
