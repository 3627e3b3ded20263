//! Unit and row integrity checks (SG3xx).

use super::{bound, ratio, unbound_columns};
use crate::core::{
    Check, CheckCategory, ColumnKind, ColumnRoles, DatasetView, Params, Requirements, Role, Severity,
    Violation,
};
use crate::prelude::*;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Number of offending identifiers echoed into a violation's context.
const SAMPLE_LIMIT: usize = 10;

/// SG301: unit identifiers that appear on more than one row.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateUnits;

impl Check for DuplicateUnits {
    fn code(&self) -> &str {
        "SG301"
    }

    fn name(&self) -> &str {
        "Duplicate Units"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Checks that each unit identifier appears exactly once"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Unit)
    }

    fn parameters(&self) -> &[&'static str] {
        &["check_duplicate_units"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        if !params.bool("check_duplicate_units")? {
            return Ok(vec![]);
        }
        let unit = bound(roles, Role::Unit, self.code())?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let ids = view.values(unit)?;
        for id in ids.iter().flatten() {
            *counts.entry(id.as_str()).or_insert(0) += 1;
        }

        let duplicated: Vec<&str> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(id, _)| *id)
            .collect();
        if duplicated.is_empty() {
            return Ok(vec![]);
        }
        let extra_rows: usize = counts.values().filter(|count| **count > 1).map(|count| count - 1).sum();

        Ok(vec![self
            .violation(
                Severity::Error,
                format!("{} duplicate unit identifiers detected", duplicated.len()),
            )
            .with_suggestion("Each unit must appear exactly once; aggregate or deduplicate")
            .with_context("unit_column", unit)
            .with_context("duplicate_ids", duplicated.len())
            .with_context("extra_rows", extra_rows)
            .with_context("examples", json!(&duplicated[..duplicated.len().min(SAMPLE_LIMIT)]))])
    }
}

/// SG302: rows that repeat another row in every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateRows;

impl Check for DuplicateRows {
    fn code(&self) -> &str {
        "SG302"
    }

    fn name(&self) -> &str {
        "Duplicate Rows"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Detects fully duplicated rows"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["check_duplicate_rows"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        if !params.bool("check_duplicate_rows")? {
            return Ok(vec![]);
        }
        let signatures = view.row_signatures()?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for signature in &signatures {
            *counts.entry(signature.as_str()).or_insert(0) += 1;
        }

        let patterns = counts.values().filter(|count| **count > 1).count();
        if patterns == 0 || (counts.len() == 1 && constant_numeric_target(view, roles)?) {
            return Ok(vec![]);
        }
        let duplicates = signatures.len() - counts.len();

        Ok(vec![self
            .violation(
                Severity::Error,
                format!("{duplicates} duplicate rows detected ({patterns} unique patterns)"),
            )
            .with_suggestion("Remove duplicate rows before analysis")
            .with_context("duplicate_rows", duplicates)
            .with_context("unique_patterns", patterns)
            .with_context("duplicate_pct", ratio(duplicates, signatures.len()))])
    }
}

/// Every row identical around a numeric target is zero variance, which SG201
/// reports on its own.
fn constant_numeric_target(view: &DatasetView, roles: &ColumnRoles) -> Result<bool> {
    let Some(target) = roles.target() else {
        return Ok(false);
    };
    if view.column_kind(target)? != ColumnKind::Numeric {
        return Ok(false);
    }
    Ok(view.present_numeric(target)?.len() >= 2)
}

/// SG303: units assigned to more than one group.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitLeakage;

impl Check for UnitLeakage {
    fn code(&self) -> &str {
        "SG303"
    }

    fn name(&self) -> &str {
        "Unit Leakage"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Checks that no unit appears in more than one group"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Unit).role(Role::Group)
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, _params: &Params) -> Result<Vec<Violation>> {
        let unit = bound(roles, Role::Unit, self.code())?;
        let group = bound(roles, Role::Group, self.code())?;
        let ids = view.values(unit)?;
        let labels = view.values(group)?;

        let mut memberships: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (id, label) in ids.iter().zip(labels.iter()) {
            if let (Some(id), Some(label)) = (id, label) {
                memberships.entry(id.as_str()).or_default().insert(label.as_str());
            }
        }

        let leaking: Vec<&str> = memberships
            .iter()
            .filter(|(_, groups)| groups.len() > 1)
            .map(|(id, _)| *id)
            .collect();
        if leaking.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![self
            .violation(
                Severity::Error,
                format!("{} units appear in multiple groups", leaking.len()),
            )
            .with_suggestion("Fix group assignment to prevent unit-level leakage")
            .with_context("leaking_units", leaking.len())
            .with_context("examples", json!(&leaking[..leaking.len().min(SAMPLE_LIMIT)]))])
    }
}

/// SG304: rows without a unit identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingUnitId;

impl Check for MissingUnitId {
    fn code(&self) -> &str {
        "SG304"
    }

    fn name(&self) -> &str {
        "Missing Unit Id"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Checks for rows without a unit identifier"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Unit)
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, _params: &Params) -> Result<Vec<Violation>> {
        let unit = bound(roles, Role::Unit, self.code())?;
        let missing = view.null_count(unit)?;
        if missing == 0 {
            return Ok(vec![]);
        }
        Ok(vec![self
            .violation(Severity::Error, format!("{missing} missing unit identifiers detected"))
            .with_suggestion("Remove or fix null unit IDs before analysis")
            .with_context("missing_count", missing)
            .with_context("missing_pct", ratio(missing, view.row_count()))])
    }
}

/// SG305: target cells that cannot be read as numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataType;

impl Check for DataType {
    fn code(&self) -> &str {
        "SG305"
    }

    fn name(&self) -> &str {
        "Data Type"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Checks that the target column holds numeric values"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().role(Role::Target)
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, _params: &Params) -> Result<Vec<Violation>> {
        let target = bound(roles, Role::Target, self.code())?;
        let labels = view.values(target)?;
        let numbers = view.numeric_values(target)?;

        let offending: Vec<&str> = labels
            .iter()
            .zip(numbers.iter())
            .filter_map(|(label, number)| match (label, number) {
                (Some(label), None) => Some(label.as_str()),
                _ => None,
            })
            .collect();
        if offending.is_empty() {
            return Ok(vec![]);
        }

        let examples: BTreeSet<&str> = offending.iter().copied().take(SAMPLE_LIMIT).collect();
        Ok(vec![self
            .violation(
                Severity::Error,
                format!("Target column contains {} non-numeric values", offending.len()),
            )
            .with_suggestion("Convert to numeric or exclude non-numeric values")
            .with_context("column", target)
            .with_context("non_numeric_count", offending.len())
            .with_context("examples", json!(examples))])
    }
}

/// SG306: non-role columns holding a single distinct value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantColumns;

impl Check for ConstantColumns {
    fn code(&self) -> &str {
        "SG306"
    }

    fn name(&self) -> &str {
        "Constant Columns"
    }

    fn category(&self) -> CheckCategory {
        CheckCategory::Integrity
    }

    fn description(&self) -> &str {
        "Detects columns that carry a single value"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().min_rows(1)
    }

    fn parameters(&self) -> &[&'static str] {
        &["flag_constant_columns"]
    }

    fn evaluate(&self, view: &DatasetView, roles: &ColumnRoles, params: &Params) -> Result<Vec<Violation>> {
        if !params.bool("flag_constant_columns")? {
            return Ok(vec![]);
        }
        let mut violations = Vec::new();
        for column in unbound_columns(view, roles) {
            let values = view.values(column)?;
            let distinct: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
            if distinct.len() != 1 {
                continue;
            }
            let value = distinct.first().copied().unwrap_or_default();
            violations.push(
                self.violation(
                    Severity::Warning,
                    format!("Column '{column}' is constant (value: {value})"),
                )
                .with_suggestion("Remove constant columns as they provide no information")
                .with_context("column", column)
                .with_context("value", value),
            );
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::core::{Params, Policy};

    fn run(check: &dyn Check, view: &DatasetView, roles: &ColumnRoles) -> Vec<Violation> {
        let params = Policy::default().params_for(check.parameters()).unwrap();
        check.evaluate(view, roles, &params).unwrap()
    }

    #[test]
    fn test_duplicate_units() {
        let view = view(vec![("id", ints(vec![1, 2, 2, 3, 3, 3]))]);
        let roles = ColumnRoles::new().with_unit("id");
        let violations = run(&DuplicateUnits, &view, &roles);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_error());
        assert_eq!(violations[0].context["duplicate_ids"], 2);
        assert_eq!(violations[0].context["extra_rows"], 3);

        let disabled = Params::new().with("check_duplicate_units", false);
        assert!(DuplicateUnits.evaluate(&view, &roles, &disabled).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_rows() {
        let view = view(vec![
            ("x", dense(&[1.0, 1.0, 2.0, 1.0])),
            ("arm", labels(vec![Some("a"), Some("a"), Some("b"), Some("b")])),
        ]);
        let violations = run(&DuplicateRows, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["duplicate_rows"], 1);
        assert_eq!(violations[0].context["unique_patterns"], 1);
    }

    #[test]
    fn test_constant_target_rows_defer_to_zero_variance() {
        let view = view(vec![("y", dense(&[4.0; 6]))]);
        let target = ColumnRoles::new().with_target("y");
        assert!(run(&DuplicateRows, &view, &target).is_empty());

        // Without a target the repeated rows are still duplicates.
        let violations = run(&DuplicateRows, &view, &ColumnRoles::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["duplicate_rows"], 5);
    }

    #[test]
    fn test_unit_leakage() {
        let view = view(vec![
            ("id", ints(vec![1, 1, 2, 3])),
            ("arm", labels(vec![Some("a"), Some("b"), Some("a"), Some("b")])),
        ]);
        let roles = ColumnRoles::new().with_unit("id").with_group("arm");
        let violations = run(&UnitLeakage, &view, &roles);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["examples"], json!(["1"]));
    }

    #[test]
    fn test_missing_unit_id() {
        let view = view(vec![("id", labels(vec![Some("u1"), None, Some("u3"), None]))]);
        let violations = run(&MissingUnitId, &view, &ColumnRoles::new().with_unit("id"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["missing_count"], 2);
        assert_eq!(violations[0].context["missing_pct"], 0.5);
    }

    #[test]
    fn test_data_type() {
        let text = view(vec![("y", labels(vec![Some("1.5"), Some("n/a"), None, Some("3")]))]);
        let violations = run(&DataType, &text, &ColumnRoles::new().with_target("y"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].context["non_numeric_count"], 1);

        let numeric = view(vec![("y", dense(&[1.0, 2.0]))]);
        assert!(run(&DataType, &numeric, &ColumnRoles::new().with_target("y")).is_empty());
    }

    #[test]
    fn test_constant_columns_ignore_roles() {
        let view = view(vec![
            ("y", dense(&[1.0, 1.0, 1.0])),
            ("region", labels(vec![Some("eu"), Some("eu"), None])),
            ("x", dense(&[1.0, 2.0, 3.0])),
        ]);
        let violations = run(&ConstantColumns, &view, &ColumnRoles::new().with_target("y"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].context["column"], "region");
    }
}
