//! Built-in statistical checks.
//!
//! Checks are grouped by family; the hundreds digit of the code names the
//! family:
//!
//! | Codes | Module | Concern |
//! |---|---|---|
//! | SG1xx | [`sample_size`] | sample size, power, balance, effect size |
//! | SG2xx | [`distribution`] | variance, shape, normality, equal variances |
//! | SG3xx | [`integrity`] | duplicates, leakage, identifiers, types |
//! | SG4xx | [`correlation`] | collinearity among features and with the target |
//! | SG5xx | [`outliers`] | outliers, extreme values, bounds |
//! | SG6xx | [`missing`] | missing values and their structure |
//! | SG7xx | [`cardinality`] | categorical levels and identifier-like columns |
//!
//! Every check is a unit struct implementing [`Check`]; instances carry no
//! state, so a single registry entry can serve concurrent runs.

pub mod cardinality;
pub mod correlation;
pub mod distribution;
pub mod integrity;
pub mod missing;
pub mod outliers;
pub mod sample_size;

use crate::core::{Check, ColumnKind, ColumnRoles, DatasetView, Role};
use crate::prelude::*;
use std::sync::Arc;

pub use cardinality::{EmptyColumns, HighCardinality, IdentifierColumns, LowCardinality, RareCategories};
pub use correlation::{HighCorrelation, Multicollinearity, WeakTargetCorrelation};
pub use distribution::{Heteroscedasticity, Kurtosis, NearZeroVariance, Normality, Skewness, ZeroVariance};
pub use integrity::{
    ConstantColumns, DataType, DuplicateRows, DuplicateUnits, MissingUnitId, UnitLeakage,
};
pub use missing::{CompleteCases, ExcessiveMissing, MissingPattern, MissingTarget};
pub use outliers::{ExtremeValues, OutlierCluster, Outliers, Winsorization};
pub use sample_size::{BalancedGroups, CovariateBalance, EffectSize, MinimumSampleSize, StatisticalPower};

/// Label used for the whole sample when no group column is bound.
pub const OVERALL_GROUP: &str = "overall";

/// Returns one instance of every built-in check, ordered by code.
pub fn builtin_checks() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(MinimumSampleSize),
        Arc::new(StatisticalPower),
        Arc::new(BalancedGroups),
        Arc::new(CovariateBalance),
        Arc::new(EffectSize),
        Arc::new(ZeroVariance),
        Arc::new(NearZeroVariance),
        Arc::new(Skewness),
        Arc::new(Kurtosis),
        Arc::new(Normality),
        Arc::new(Heteroscedasticity),
        Arc::new(DuplicateUnits),
        Arc::new(DuplicateRows),
        Arc::new(UnitLeakage),
        Arc::new(MissingUnitId),
        Arc::new(DataType),
        Arc::new(ConstantColumns),
        Arc::new(HighCorrelation),
        Arc::new(Multicollinearity),
        Arc::new(WeakTargetCorrelation),
        Arc::new(Outliers),
        Arc::new(Winsorization),
        Arc::new(OutlierCluster),
        Arc::new(ExtremeValues),
        Arc::new(ExcessiveMissing),
        Arc::new(MissingTarget),
        Arc::new(MissingPattern),
        Arc::new(CompleteCases),
        Arc::new(HighCardinality),
        Arc::new(LowCardinality),
        Arc::new(RareCategories),
        Arc::new(EmptyColumns),
        Arc::new(IdentifierColumns),
    ]
}

/// Returns the column bound to `role`.
///
/// Requirements guarantee the binding before `evaluate` runs, so a missing
/// binding is a defect in the check.
pub(crate) fn bound<'a>(roles: &'a ColumnRoles, role: Role, check: &str) -> Result<&'a str> {
    roles
        .get(role)
        .ok_or_else(|| StatGuardError::check_evaluation(check, format!("no {role} column bound")))
}

/// Finite target values split by group, or a single `overall` sample.
pub(crate) fn target_samples(
    view: &DatasetView,
    roles: &ColumnRoles,
    check: &str,
) -> Result<Vec<(String, Vec<f64>)>> {
    let target = bound(roles, Role::Target, check)?;
    match roles.group() {
        Some(group) => Ok(view.grouped_numeric(target, group)?.into_iter().collect()),
        None => Ok(vec![(OVERALL_GROUP.to_string(), view.present_numeric(target)?)]),
    }
}

/// The two target samples of a two-group design, in label order.
pub(crate) fn two_samples(
    view: &DatasetView,
    roles: &ColumnRoles,
    check: &str,
) -> Result<Option<[(String, Vec<f64>); 2]>> {
    let target = bound(roles, Role::Target, check)?;
    let group = bound(roles, Role::Group, check)?;
    let mut groups = view.grouped_numeric(target, group)?.into_iter();
    match (groups.next(), groups.next(), groups.next()) {
        (Some(first), Some(second), None) => Ok(Some([first, second])),
        _ => Ok(None),
    }
}

/// Columns of `kind` that fill no role, in schema order.
pub(crate) fn feature_columns<'a>(view: &'a DatasetView, roles: &ColumnRoles, kind: ColumnKind) -> Vec<&'a str> {
    view.columns_of_kind(kind)
        .into_iter()
        .filter(|column| !roles.is_bound(column))
        .collect()
}

/// Columns that fill no role, in schema order.
pub(crate) fn unbound_columns<'a>(view: &'a DatasetView, roles: &ColumnRoles) -> Vec<&'a str> {
    view.column_names()
        .into_iter()
        .filter(|column| !roles.is_bound(column))
        .collect()
}

/// Share of `part` in `whole`, 0 for an empty whole.
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_builtin_codes_are_unique_and_sorted() {
        let codes: Vec<String> = builtin_checks().iter().map(|c| c.code().to_string()).collect();
        let unique: BTreeSet<_> = codes.iter().cloned().collect();
        assert_eq!(unique.len(), codes.len());
        assert_eq!(codes, unique.into_iter().collect::<Vec<_>>());
        assert_eq!(codes.len(), 33);
    }

    #[test]
    fn test_declared_parameters_exist_in_default_policy() {
        let policy = crate::core::Policy::default();
        for check in builtin_checks() {
            for parameter in check.parameters() {
                assert!(
                    policy.resolve(parameter).is_ok(),
                    "{} declares unknown parameter {parameter}",
                    check.code()
                );
            }
        }
    }

    #[test]
    fn test_categories_match_code_family() {
        use crate::core::CheckCategory::*;
        for check in builtin_checks() {
            let expected = match &check.code()[..3] {
                "SG1" => SampleSize,
                "SG2" => Distribution,
                "SG3" => Integrity,
                "SG4" => Correlation,
                "SG5" => Outliers,
                "SG6" => MissingData,
                _ => Cardinality,
            };
            assert_eq!(check.category(), expected, "{}", check.code());
        }
    }
}
