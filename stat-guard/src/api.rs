//! High-level entry points.
//!
//! These functions wire the global check registry and policy catalog into
//! the engine for the common cases. Use [`validate_with`] or
//! [`ValidationEngine`] directly for full control.
//!
//! # Examples
//!
//! ```rust
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use stat_guard::api;
//! use stat_guard::core::DatasetView;
//! use std::sync::Arc;
//!
//! let revenue: Vec<f64> = (0..200).map(|i| 20.0 + ((i * 37) % 41) as f64).collect();
//! let arms: Vec<&str> = (0..200).map(|i| if i % 2 == 0 { "control" } else { "treatment" }).collect();
//! let view = DatasetView::try_from_columns(vec![
//!     ("revenue", Arc::new(Float64Array::from(revenue)) as ArrayRef),
//!     ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
//! ])
//! .unwrap();
//!
//! let report = api::validate(&view, "revenue", Some("arm"), None, "lenient", false).unwrap();
//! println!("{}", report.to_human().unwrap());
//! ```

use crate::analyzers::{Comparator, ComparisonResult, DatasetProfile, DatasetProfiler, ProfileOptions};
use crate::core::{
    CancellationToken, Check, CheckDescriptor, CheckRegistry, ColumnRoles, DatasetView, EngineConfig,
    ParamValue, Policy, PolicyCatalog, Report, ValidationEngine,
};
use crate::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};
use tracing::warn;

/// A policy given by catalog name or by value.
#[derive(Debug, Clone)]
pub enum PolicyRef {
    /// Looked up in the global policy catalog
    Named(String),
    /// Used as is
    Policy(Policy),
}

impl PolicyRef {
    /// Returns the policy, looking names up in the global catalog.
    pub fn resolve(self) -> Result<Policy> {
        match self {
            PolicyRef::Named(name) => Policy::named(&name),
            PolicyRef::Policy(policy) => Ok(policy),
        }
    }
}

impl From<&str> for PolicyRef {
    fn from(name: &str) -> Self {
        PolicyRef::Named(name.to_string())
    }
}

impl From<String> for PolicyRef {
    fn from(name: String) -> Self {
        PolicyRef::Named(name)
    }
}

impl From<Policy> for PolicyRef {
    fn from(policy: Policy) -> Self {
        PolicyRef::Policy(policy)
    }
}

impl From<&Policy> for PolicyRef {
    fn from(policy: &Policy) -> Self {
        PolicyRef::Policy(policy.clone())
    }
}

/// Execution options for [`validate_with`].
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Registry to draw checks from; the global one when `None`
    pub registry: Option<Arc<CheckRegistry>>,
    pub engine: EngineConfig,
    pub cancellation: Option<CancellationToken>,
}

impl ValidateOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `registry` instead of the global one.
    pub fn registry(mut self, registry: Arc<CheckRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Stops after the first check that emits an error.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.engine.fail_fast = fail_fast;
        self
    }

    /// Evaluates checks in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.engine.parallel = parallel;
        self
    }

    /// Observes `token` between checks.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn engine(self) -> ValidationEngine {
        let mut builder = ValidationEngine::builder().config(self.engine);
        if let Some(registry) = self.registry {
            builder = builder.registry(registry);
        }
        if let Some(token) = self.cancellation {
            builder = builder.cancellation(token);
        }
        builder.build()
    }
}

/// Validates `view` with `target` and optional group and unit columns.
pub fn validate(
    view: &DatasetView,
    target: &str,
    group: Option<&str>,
    unit: Option<&str>,
    policy: impl Into<PolicyRef>,
    fail_fast: bool,
) -> Result<Report> {
    let policy = policy.into().resolve()?;
    validate_with(
        view,
        &roles(target, group, unit),
        &policy,
        ValidateOptions::new().fail_fast(fail_fast),
    )
}

/// Validates `view` with explicit roles and execution options.
pub fn validate_with(
    view: &DatasetView,
    roles: &ColumnRoles,
    policy: &Policy,
    options: ValidateOptions,
) -> Result<Report> {
    options.engine().run(view, policy, roles)
}

/// Validates several target columns of one dataset.
///
/// Targets the dataset lacks are skipped; the result is keyed by target.
pub fn validate_multiple<I, S>(
    view: &DatasetView,
    targets: I,
    group: Option<&str>,
    unit: Option<&str>,
    policy: impl Into<PolicyRef>,
) -> Result<BTreeMap<String, Report>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let policy = policy.into().resolve()?;
    let engine = ValidationEngine::default();
    let mut reports = BTreeMap::new();
    for target in targets {
        let target = target.as_ref();
        if !view.has_column(target) {
            warn!(target, "Skipping target column not present in dataset");
            continue;
        }
        let report = engine.run(view, &policy, &roles(target, group, unit))?;
        reports.insert(target.to_string(), report);
    }
    Ok(reports)
}

/// Returns true if `view` passes the `default` policy for `target`.
///
/// Configuration problems, such as a missing target column, count as a
/// failure.
pub fn quick_check(view: &DatasetView, target: &str) -> bool {
    match validate(view, target, None, None, "default", false) {
        Ok(report) => report.is_valid(),
        Err(err) => {
            warn!(target, error = %err, "Quick check could not run");
            false
        }
    }
}

/// Validates an A/B test under the `experiment` policy.
pub fn check_experiment(
    view: &DatasetView,
    metric: &str,
    treatment: &str,
    user_id: Option<&str>,
) -> Result<Report> {
    validate(view, metric, Some(treatment), user_id, "experiment", false)
}

/// Validates a time series under the `time_series` policy.
pub fn check_time_series(view: &DatasetView, target: &str, timestamp: &str) -> Result<Report> {
    let policy = Policy::named("time_series")?;
    let roles = ColumnRoles::new().with_target(target).with_time(timestamp);
    validate_with(view, &roles, &policy, ValidateOptions::new())
}

/// Describes every check in the global registry, in code order.
pub fn list_checks() -> Vec<CheckDescriptor> {
    CheckRegistry::global().descriptors()
}

/// Names of all built-in and registered policies.
pub fn available_policies() -> Vec<String> {
    PolicyCatalog::global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .names()
}

/// Derives a `custom` policy from `base` with parameter overrides.
///
/// # Examples
///
/// ```rust
/// use stat_guard::api;
///
/// let policy = api::create_custom_policy("default", [("min_sample_size", 100)]).unwrap();
/// assert_eq!(policy.name(), "custom");
/// assert_eq!(policy.resolve("min_sample_size").unwrap().as_usize(), Some(100));
/// ```
pub fn create_custom_policy<I, K, V>(base: impl Into<PolicyRef>, overrides: I) -> Result<Policy>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    base.into().resolve()?.derive(overrides)
}

/// Adds a policy to the global catalog so it can be used by name.
pub fn register_policy(policy: Policy) -> Result<()> {
    PolicyCatalog::global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(policy)
}

/// Adds a user check to the global registry.
pub fn register_validator(check: Arc<dyn Check>) -> Result<()> {
    CheckRegistry::global().register(check)
}

/// Profiles every column of `view`.
pub fn profile(view: &DatasetView, options: ProfileOptions) -> Result<DatasetProfile> {
    DatasetProfiler::new(options).profile(view)
}

/// Compares `target` between two datasets at the default significance level.
pub fn compare(a: &DatasetView, b: &DatasetView, target: &str) -> Result<ComparisonResult> {
    Comparator::new().compare(a, b, target)
}

fn roles(target: &str, group: Option<&str>, unit: Option<&str>) -> ColumnRoles {
    let mut roles = ColumnRoles::new().with_target(target);
    if let Some(group) = group {
        roles = roles.with_group(group);
    }
    if let Some(unit) = unit {
        roles = roles.with_unit(unit);
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, StringArray};

    fn experiment() -> DatasetView {
        let revenue: Vec<f64> = (0..200).map(|i| 20.0 + ((i * 37) % 41) as f64).collect();
        let cost: Vec<f64> = (0..200).map(|i| 5.0 + ((i * 13) % 17) as f64).collect();
        let arms: Vec<&str> = (0..200)
            .map(|i| if i % 2 == 0 { "control" } else { "treatment" })
            .collect();
        DatasetView::try_from_columns(vec![
            ("revenue", Arc::new(Float64Array::from(revenue)) as ArrayRef),
            ("cost", Arc::new(Float64Array::from(cost)) as ArrayRef),
            ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_policy_ref_resolution() {
        assert_eq!(PolicyRef::from("strict").resolve().unwrap().name(), "strict");
        assert_eq!(PolicyRef::from(Policy::lenient()).resolve().unwrap().name(), "lenient");
        let err = PolicyRef::from("paranoid").resolve().unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownPolicy { .. }));
    }

    #[test]
    fn test_validate_records_roles_and_policy() {
        let report = validate(&experiment(), "revenue", Some("arm"), None, "lenient", false).unwrap();
        assert_eq!(report.metadata().policy, "lenient");
        assert_eq!(report.metadata().roles.group(), Some("arm"));
        assert!(report.checks_run().iter().any(|code| code == "SG103"));
    }

    #[test]
    fn test_validate_unknown_column_is_configuration_error() {
        let err = validate(&experiment(), "profit", None, None, "default", false).unwrap_err();
        assert!(err.is_configuration());
        assert!(!quick_check(&experiment(), "profit"));
    }

    #[test]
    fn test_validate_multiple_skips_absent_targets() {
        let reports =
            validate_multiple(&experiment(), ["revenue", "cost", "profit"], Some("arm"), None, "lenient")
                .unwrap();
        assert_eq!(reports.keys().collect::<Vec<_>>(), vec!["cost", "revenue"]);
        assert_eq!(reports["cost"].metadata().roles.target(), Some("cost"));
    }

    #[test]
    fn test_check_time_series_binds_time() {
        let report = check_time_series(&experiment(), "revenue", "arm").unwrap();
        assert_eq!(report.metadata().policy, "time_series");
        assert_eq!(report.metadata().roles.time(), Some("arm"));
    }

    #[test]
    fn test_catalog_functions() {
        let policies = available_policies();
        for name in ["default", "strict", "lenient", "experiment", "time_series"] {
            assert!(policies.iter().any(|p| p == name));
        }

        let checks = list_checks();
        assert!(checks.len() >= 33);
        assert_eq!(checks[0].code, "SG101");

        let custom = create_custom_policy("strict", [("max_missing_pct", 0.3)]).unwrap();
        assert_eq!(custom.base(), Some("strict"));
        assert!(create_custom_policy("default", [("no_such_parameter", 1)]).is_err());
    }

    #[test]
    fn test_profile_and_compare() {
        let view = experiment();
        let profile = profile(&view, ProfileOptions::default()).unwrap();
        assert_eq!(profile.n_columns, 3);

        let result = compare(&view, &view, "revenue").unwrap();
        assert!(!result.drift_detected);
    }
}
