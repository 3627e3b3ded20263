//! Validation policies: named, immutable bundles of thresholds.
//!
//! A [`Policy`] stores a fully resolved, flat map of parameter values plus a
//! set of disabled check codes. Customisation never mutates a policy: it
//! builds a new one from a base via [`Policy::derive`] or [`PolicyBuilder`],
//! copying the base values once at build time.
//!
//! Five built-in policies are provided (`default`, `strict`, `lenient`,
//! `experiment` and `time_series`). They differ only in parameter values and
//! disabled checks; the engine never looks at a policy's name.
//!
//! # Examples
//!
//! ```rust
//! use stat_guard::core::Policy;
//!
//! let strict = Policy::strict();
//! let custom = strict.derive([("min_sample_size", 80)]).unwrap();
//!
//! assert_eq!(custom.resolve("min_sample_size").unwrap().as_usize(), Some(80));
//! assert_eq!(custom.resolve("max_smd").unwrap().as_f64(), Some(0.10));
//! assert_eq!(custom.base(), Some("strict"));
//! ```

use crate::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Names of the built-in policies.
pub const BUILTIN_POLICIES: [&str; 5] = ["default", "strict", "lenient", "experiment", "time_series"];

/// A single policy parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Explicitly unset (e.g. an optional bound)
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Returns a short name for the value's type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
        }
    }

    /// Returns the value as a float; integers convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an integer; whole floats convert.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Returns the value as a non-negative count.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    /// Returns the value as a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true for [`ParamValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, ParamValue::Integer(_) | ParamValue::Float(_))
    }

    /// Converts an override so that it has the same type as `current`.
    ///
    /// Numeric values convert between integer and float. A `Null` slot is an
    /// unset optional number: it takes a number or stays `Null`, and a numeric
    /// slot may be reset to `Null`.
    fn coerce_like(self, current: &ParamValue, name: &str) -> Result<ParamValue> {
        let mismatch =
            |found: &ParamValue| StatGuardError::invalid_parameter(name, current.kind_name(), found.kind_name());
        match (current, self) {
            (ParamValue::Null, ParamValue::Null) => Ok(ParamValue::Null),
            (ParamValue::Null, value) if value.is_numeric() => {
                Ok(ParamValue::Float(value.as_f64().unwrap_or_default()))
            }
            (ParamValue::Null, value) => Err(StatGuardError::invalid_parameter(
                name,
                "number or null",
                value.kind_name(),
            )),
            (ParamValue::Integer(_) | ParamValue::Float(_), ParamValue::Null) => Ok(ParamValue::Null),
            (ParamValue::Integer(_), value) if value.is_numeric() => {
                value.as_i64().map(ParamValue::Integer).ok_or_else(|| mismatch(&value))
            }
            (ParamValue::Float(_), value) if value.is_numeric() => {
                Ok(ParamValue::Float(value.as_f64().unwrap_or_default()))
            }
            (ParamValue::Bool(_), value @ ParamValue::Bool(_)) => Ok(value),
            (ParamValue::Text(_), value @ ParamValue::Text(_)) => Ok(value),
            (_, value) => Err(mismatch(&value)),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// The parameter values resolved for one check.
///
/// The typed accessors fail with `UnknownParameter` when the check reads a
/// parameter it did not declare and with `InvalidParameter` on a type mismatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value; used by the engine and by tests evaluating checks directly.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value.
    pub fn get(&self, name: &str) -> Result<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| StatGuardError::unknown_parameter(name))
    }

    /// Returns a numeric parameter.
    pub fn f64(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        value
            .as_f64()
            .ok_or_else(|| StatGuardError::invalid_parameter(name, "number", value.kind_name()))
    }

    /// Returns an optional numeric parameter (`Null` means unset).
    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name)? {
            ParamValue::Null => Ok(None),
            _ => self.f64(name).map(Some),
        }
    }

    /// Returns a count parameter.
    pub fn usize(&self, name: &str) -> Result<usize> {
        let value = self.get(name)?;
        value.as_usize().ok_or_else(|| {
            StatGuardError::invalid_parameter(name, "non-negative integer", value.kind_name())
        })
    }

    /// Returns a flag parameter.
    pub fn bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        value
            .as_bool()
            .ok_or_else(|| StatGuardError::invalid_parameter(name, "bool", value.kind_name()))
    }

    /// Returns a text parameter.
    pub fn str(&self, name: &str) -> Result<&str> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| StatGuardError::invalid_parameter(name, "text", value.kind_name()))
    }

    /// Iterates over the values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A named, immutable set of thresholds and disabled checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    description: String,
    parameters: BTreeMap<String, ParamValue>,
    disabled: BTreeSet<String>,
}

impl Policy {
    /// Starts a policy with no base and no parameters.
    pub fn builder(name: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder::new(name)
    }

    /// Returns a built-in policy by name.
    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::default_policy()),
            "strict" => Ok(Self::strict()),
            "lenient" => Ok(Self::lenient()),
            "experiment" => Ok(Self::experiment()),
            "time_series" => Ok(Self::time_series()),
            _ => Err(StatGuardError::UnknownPolicy {
                name: name.to_string(),
            }),
        }
    }

    /// Returns a built-in or registered policy from the global catalog.
    pub fn named(name: &str) -> Result<Self> {
        PolicyCatalog::global()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    /// Balanced thresholds suitable for most analyses.
    pub fn default_policy() -> Self {
        Self {
            name: "default".to_string(),
            base: None,
            description: "Balanced thresholds for general statistical analysis".to_string(),
            parameters: default_parameters(),
            disabled: BTreeSet::new(),
        }
    }

    /// Tighter thresholds for high-stakes analyses.
    pub fn strict() -> Self {
        Self::from_default(
            "strict",
            "Tighter thresholds for high-stakes analyses",
            &[
                ("min_sample_size", ParamValue::Integer(50)),
                ("min_sample_size_per_group", ParamValue::Integer(25)),
                ("max_imbalance_ratio", ParamValue::Float(1.5)),
                ("max_smd", ParamValue::Float(0.10)),
                ("max_skewness", ParamValue::Float(1.5)),
                ("max_kurtosis", ParamValue::Float(5.0)),
                ("max_missing_pct", ParamValue::Float(0.02)),
                ("max_missing_pct_column", ParamValue::Float(0.10)),
                ("max_correlation", ParamValue::Float(0.90)),
                ("vif_threshold", ParamValue::Float(4.0)),
                ("outlier_threshold", ParamValue::Float(2.5)),
                ("max_outlier_pct", ParamValue::Float(0.02)),
            ],
            &[],
        )
    }

    /// Relaxed thresholds for exploratory work.
    pub fn lenient() -> Self {
        Self::from_default(
            "lenient",
            "Relaxed thresholds for exploratory analysis",
            &[
                ("min_sample_size", ParamValue::Integer(10)),
                ("min_sample_size_per_group", ParamValue::Integer(5)),
                ("max_imbalance_ratio", ParamValue::Float(20.0)),
                ("max_smd", ParamValue::Float(0.50)),
                ("max_skewness", ParamValue::Float(3.0)),
                ("max_kurtosis", ParamValue::Float(10.0)),
                ("max_missing_pct", ParamValue::Float(0.20)),
                ("max_missing_pct_column", ParamValue::Float(0.50)),
                ("max_correlation", ParamValue::Float(0.99)),
                ("vif_threshold", ParamValue::Float(10.0)),
            ],
            &["SG205"],
        )
    }

    /// Thresholds for randomised experiments and A/B tests.
    pub fn experiment() -> Self {
        Self::from_default(
            "experiment",
            "Thresholds for randomised experiments and A/B tests",
            &[
                ("min_sample_size", ParamValue::Integer(100)),
                ("min_sample_size_per_group", ParamValue::Integer(50)),
                ("max_imbalance_ratio", ParamValue::Float(1.2)),
                ("max_smd", ParamValue::Float(0.10)),
                ("max_missing_pct", ParamValue::Float(0.01)),
            ],
            &[],
        )
    }

    /// Thresholds for time-ordered data.
    pub fn time_series() -> Self {
        Self::from_default(
            "time_series",
            "Thresholds for time-ordered data",
            &[
                ("max_timestamp_gap_pct", ParamValue::Float(0.05)),
                ("normality_alpha", ParamValue::Float(0.01)),
            ],
            &[],
        )
    }

    fn from_default(
        name: &str,
        description: &str,
        overrides: &[(&str, ParamValue)],
        disabled: &[&str],
    ) -> Self {
        let mut policy = Self::default_policy();
        policy.name = name.to_string();
        policy.base = Some("default".to_string());
        policy.description = description.to_string();
        for (key, value) in overrides {
            policy.parameters.insert((*key).to_string(), value.clone());
        }
        policy.disabled = disabled.iter().map(|code| (*code).to_string()).collect();
        policy
    }

    /// Loads a policy description from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file '{}'", path.display()))?;
        Self::from_json_str(&contents)
    }

    /// Parses a policy description from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: PolicyFile = serde_json::from_str(json)?;
        let catalog = PolicyCatalog::global()
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        file.into_policy(&catalog)
    }

    /// Returns the policy name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the policy this one was derived from.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns all resolved parameters.
    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    /// Returns the disabled check codes.
    pub fn disabled_checks(&self) -> &BTreeSet<String> {
        &self.disabled
    }

    /// Resolves a parameter value.
    pub fn resolve(&self, name: &str) -> Result<&ParamValue> {
        self.parameters
            .get(name)
            .ok_or_else(|| StatGuardError::unknown_parameter(name))
    }

    /// Returns true unless the check is disabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        !self.disabled.contains(code)
    }

    /// Resolves the named parameters into a [`Params`] set.
    pub fn params_for(&self, names: &[&str]) -> Result<Params> {
        names.iter().try_fold(Params::new(), |params, name| {
            Ok(params.with(*name, self.resolve(name)?.clone()))
        })
    }

    /// Derives a new policy named `custom` whose base is this policy.
    ///
    /// Every override must name an existing parameter and carry a compatible
    /// type. Use [`PolicyBuilder::define`] to introduce new parameters.
    pub fn derive<I, K, V>(&self, overrides: I) -> Result<Policy>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        overrides
            .into_iter()
            .fold(PolicyBuilder::new("custom").base(self), |builder, (k, v)| {
                builder.set(k, v)
            })
            .build()
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::default_policy()
    }
}

fn default_parameters() -> BTreeMap<String, ParamValue> {
    use ParamValue::{Bool, Float, Integer, Null, Text};

    let entries = [
        // sample size and power
        ("min_sample_size", Integer(30)),
        ("min_sample_size_per_group", Integer(15)),
        ("max_imbalance_ratio", Float(2.0)),
        ("max_smd", Float(0.25)),
        ("min_power", Float(0.80)),
        ("min_effect_size", Float(0.1)),
        ("significance_level", Float(0.05)),
        // distribution
        ("max_skewness", Float(2.0)),
        ("max_kurtosis", Float(7.0)),
        ("normality_alpha", Float(0.05)),
        ("min_shapiro_sample", Integer(20)),
        ("max_shapiro_sample", Integer(5000)),
        ("variance_threshold", Float(1e-10)),
        ("near_zero_variance_ratio", Float(0.95)),
        // missing data
        ("max_missing_pct", Float(0.05)),
        ("max_missing_pct_column", Float(0.20)),
        ("max_missing_target_pct", Float(0.10)),
        ("min_complete_case_ratio", Float(0.9)),
        ("flag_missing_pattern", Bool(true)),
        // outliers
        ("outlier_method", Text("iqr".to_string())),
        ("outlier_threshold", Float(3.0)),
        ("max_outlier_pct", Float(0.05)),
        ("flag_outlier_clusters", Bool(true)),
        ("winsorize_threshold", Float(0.01)),
        ("lower_bound", Null),
        ("upper_bound", Null),
        // correlation
        ("max_correlation", Float(0.95)),
        ("vif_threshold", Float(5.0)),
        ("min_target_correlation", Float(0.01)),
        // cardinality
        ("max_cardinality_ratio", Float(0.95)),
        ("min_cardinality_ratio", Float(0.01)),
        ("rare_category_threshold", Integer(5)),
        // integrity
        ("check_duplicate_rows", Bool(true)),
        ("check_duplicate_units", Bool(true)),
        ("flag_constant_columns", Bool(true)),
        ("flag_high_cardinality", Bool(true)),
        // time series
        ("max_timestamp_gap_pct", Float(0.10)),
    ];

    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Builder for custom policies.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::Policy;
///
/// let policy = Policy::builder("checkout_experiment")
///     .base(&Policy::experiment())
///     .set("max_imbalance_ratio", 1.1)
///     .define("max_refund_rate", 0.02)
///     .disable("SG205")
///     .build()
///     .unwrap();
///
/// assert!(!policy.is_enabled("SG205"));
/// assert_eq!(policy.resolve("max_refund_rate").unwrap().as_f64(), Some(0.02));
/// ```
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    name: String,
    description: Option<String>,
    base: Option<Policy>,
    overrides: Vec<(String, ParamValue)>,
    definitions: Vec<(String, ParamValue)>,
    disable: Vec<String>,
    enable: Vec<String>,
}

impl PolicyBuilder {
    /// Creates a builder for a policy with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            base: None,
            overrides: Vec::new(),
            definitions: Vec::new(),
            disable: Vec::new(),
            enable: Vec::new(),
        }
    }

    /// Inherits all parameters and disabled checks of `base`.
    pub fn base(mut self, base: &Policy) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Sets a description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides an inherited parameter.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Introduces (or replaces) a parameter without type checks.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.definitions.push((name.into(), value.into()));
        self
    }

    /// Disables a check by code.
    pub fn disable(mut self, code: impl Into<String>) -> Self {
        self.disable.push(code.into());
        self
    }

    /// Re-enables a check disabled by the base.
    pub fn enable(mut self, code: impl Into<String>) -> Self {
        self.enable.push(code.into());
        self
    }

    /// Builds the policy.
    pub fn build(self) -> Result<Policy> {
        let (base_name, base_description, mut parameters, mut disabled) = match self.base {
            Some(base) => (
                Some(base.name),
                Some(base.description),
                base.parameters,
                base.disabled,
            ),
            None => (None, None, BTreeMap::new(), BTreeSet::new()),
        };

        for (name, value) in self.definitions {
            parameters.insert(name, value);
        }

        for (name, value) in self.overrides {
            let current = parameters
                .get(&name)
                .ok_or_else(|| StatGuardError::unknown_parameter(&name))?;
            let value = value.coerce_like(current, &name)?;
            debug!(policy = %self.name, parameter = %name, value = %value, "Overriding policy parameter");
            parameters.insert(name, value);
        }

        disabled.extend(self.disable);
        for code in &self.enable {
            disabled.remove(code);
        }

        let description = self.description.unwrap_or_else(|| match &base_name {
            Some(base) => format!(
                "Derived from '{base}'{}",
                base_description
                    .map(|d| format!(": {d}"))
                    .unwrap_or_default()
            ),
            None => String::new(),
        });

        Ok(Policy {
            name: self.name,
            base: base_name,
            description,
            parameters,
            disabled,
        })
    }
}

/// On-disk policy description.
///
/// ```json
/// {
///   "name": "checkout",
///   "base": "strict",
///   "overrides": { "min_sample_size": 200 },
///   "disabled": ["SG205"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyFile {
    pub name: String,
    pub base: String,
    pub description: Option<String>,
    pub overrides: BTreeMap<String, ParamValue>,
    pub define: BTreeMap<String, ParamValue>,
    pub disabled: Vec<String>,
    pub enabled: Vec<String>,
}

impl Default for PolicyFile {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            base: "default".to_string(),
            description: None,
            overrides: BTreeMap::new(),
            define: BTreeMap::new(),
            disabled: Vec::new(),
            enabled: Vec::new(),
        }
    }
}

impl PolicyFile {
    /// Resolves the base in `catalog` and builds the policy.
    pub fn into_policy(self, catalog: &PolicyCatalog) -> Result<Policy> {
        let base = catalog.get(&self.base)?;
        let mut builder = PolicyBuilder::new(self.name).base(&base);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        for (name, value) in self.define {
            builder = builder.define(name, value);
        }
        for (name, value) in self.overrides {
            builder = builder.set(name, value);
        }
        for code in self.disabled {
            builder = builder.disable(code);
        }
        for code in self.enabled {
            builder = builder.enable(code);
        }
        builder.build()
    }
}

static GLOBAL_CATALOG: Lazy<RwLock<PolicyCatalog>> =
    Lazy::new(|| RwLock::new(PolicyCatalog::with_builtins()));

/// Named policies available for lookup.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    policies: BTreeMap<String, Policy>,
}

impl PolicyCatalog {
    /// Creates a catalog holding the five built-in policies.
    pub fn with_builtins() -> Self {
        let policies = BUILTIN_POLICIES
            .iter()
            .filter_map(|name| Policy::builtin(name).ok())
            .map(|policy| (policy.name.clone(), policy))
            .collect();
        Self { policies }
    }

    /// Returns the process-wide catalog.
    pub fn global() -> &'static RwLock<PolicyCatalog> {
        &GLOBAL_CATALOG
    }

    /// Adds a policy; fails with `DuplicatePolicy` if the name is taken.
    pub fn register(&mut self, policy: Policy) -> Result<()> {
        if self.policies.contains_key(&policy.name) {
            return Err(StatGuardError::DuplicatePolicy { name: policy.name });
        }
        info!(policy = %policy.name, base = ?policy.base, "Registered policy");
        self.policies.insert(policy.name.clone(), policy);
        Ok(())
    }

    /// Returns a copy of the named policy.
    pub fn get(&self, name: &str) -> Result<Policy> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| StatGuardError::UnknownPolicy {
                name: name.to_string(),
            })
    }

    /// Returns true if a policy with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Returns all policy names in order.
    pub fn names(&self) -> Vec<String> {
        self.policies.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        for name in BUILTIN_POLICIES {
            assert_eq!(Policy::builtin(name).unwrap().name(), name);
        }
        let err = Policy::builtin("paranoid").unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownPolicy { name } if name == "paranoid"));
    }

    #[test]
    fn test_builtins_share_parameter_names() {
        let default_names: Vec<_> = Policy::default_policy().parameters().keys().cloned().collect();
        for name in BUILTIN_POLICIES {
            let policy = Policy::builtin(name).unwrap();
            let names: Vec<_> = policy.parameters().keys().cloned().collect();
            assert_eq!(names, default_names, "policy {name}");
        }
    }

    #[test]
    fn test_strict_values() {
        let strict = Policy::strict();
        assert_eq!(strict.resolve("min_sample_size").unwrap().as_usize(), Some(50));
        assert_eq!(strict.resolve("max_imbalance_ratio").unwrap().as_f64(), Some(1.5));
        // Inherited untouched from default.
        assert_eq!(strict.resolve("min_power").unwrap().as_f64(), Some(0.80));
        assert_eq!(strict.base(), Some("default"));
    }

    #[test]
    fn test_resolve_unknown_parameter() {
        let err = Policy::default_policy().resolve("max_banana").unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownParameter { name } if name == "max_banana"));
    }

    #[test]
    fn test_derive_overrides_only_named_parameter() {
        let base = Policy::default_policy();
        let derived = base.derive([("max_skewness", 1.0)]).unwrap();

        assert_eq!(derived.resolve("max_skewness").unwrap().as_f64(), Some(1.0));
        for (name, value) in base.parameters() {
            if name != "max_skewness" {
                assert_eq!(derived.resolve(name).unwrap(), value);
            }
        }
        // The base is left untouched.
        assert_eq!(base.resolve("max_skewness").unwrap().as_f64(), Some(2.0));
    }

    #[test]
    fn test_derive_rejects_unknown_and_mistyped() {
        let base = Policy::default_policy();
        assert!(matches!(
            base.derive([("max_banana", 1.0)]).unwrap_err(),
            StatGuardError::UnknownParameter { .. }
        ));
        assert!(matches!(
            base.derive([("max_skewness", "high")]).unwrap_err(),
            StatGuardError::InvalidParameter { .. }
        ));
        assert!(matches!(
            base.derive([("min_sample_size", 12.5)]).unwrap_err(),
            StatGuardError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_numeric_coercion() {
        let derived = Policy::default_policy()
            .derive([("min_sample_size", ParamValue::Float(40.0)), ("max_smd", ParamValue::Integer(1))])
            .unwrap();
        assert_eq!(derived.resolve("min_sample_size").unwrap(), &ParamValue::Integer(40));
        assert_eq!(derived.resolve("max_smd").unwrap(), &ParamValue::Float(1.0));
    }

    #[test]
    fn test_disabled_checks_inherit_and_reenable() {
        let lenient = Policy::lenient();
        assert!(!lenient.is_enabled("SG205"));
        assert!(lenient.is_enabled("SG101"));

        let derived = lenient.derive(Vec::<(String, ParamValue)>::new()).unwrap();
        assert!(!derived.is_enabled("SG205"));

        let reenabled = Policy::builder("lenient_normal")
            .base(&lenient)
            .enable("SG205")
            .disable("SG103")
            .build()
            .unwrap();
        assert!(reenabled.is_enabled("SG205"));
        assert!(!reenabled.is_enabled("SG103"));
    }

    #[test]
    fn test_optional_bounds_accept_numbers_only() {
        let bounded = Policy::default_policy()
            .derive([("lower_bound", ParamValue::Integer(0))])
            .unwrap();
        assert_eq!(bounded.resolve("lower_bound").unwrap(), &ParamValue::Float(0.0));

        let cleared = bounded.derive([("lower_bound", ParamValue::Null)]).unwrap();
        assert!(cleared.resolve("lower_bound").unwrap().is_null());

        for value in [ParamValue::from("abc"), ParamValue::Bool(true)] {
            let err = Policy::default_policy().derive([("lower_bound", value)]).unwrap_err();
            assert!(matches!(err, StatGuardError::InvalidParameter { .. }));
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_params_accessors() {
        let params = Policy::default_policy()
            .params_for(&["min_sample_size", "outlier_method", "lower_bound", "flag_outlier_clusters"])
            .unwrap();
        assert_eq!(params.usize("min_sample_size").unwrap(), 30);
        assert_eq!(params.str("outlier_method").unwrap(), "iqr");
        assert_eq!(params.opt_f64("lower_bound").unwrap(), None);
        assert!(params.bool("flag_outlier_clusters").unwrap());
        assert!(params.f64("outlier_method").is_err());
        assert!(matches!(
            params.f64("max_smd").unwrap_err(),
            StatGuardError::UnknownParameter { .. }
        ));
    }

    #[test]
    fn test_policy_file() {
        let json = r#"{
            "name": "checkout",
            "base": "strict",
            "overrides": {"min_sample_size": 200, "lower_bound": 0},
            "define": {"max_refund_rate": 0.02},
            "disabled": ["SG205"]
        }"#;
        let policy = Policy::from_json_str(json).unwrap();
        assert_eq!(policy.name(), "checkout");
        assert_eq!(policy.base(), Some("strict"));
        assert_eq!(policy.resolve("min_sample_size").unwrap().as_usize(), Some(200));
        assert_eq!(policy.resolve("lower_bound").unwrap().as_f64(), Some(0.0));
        assert_eq!(policy.resolve("max_smd").unwrap().as_f64(), Some(0.10));
        assert!(!policy.is_enabled("SG205"));

        let err = Policy::from_json_str(r#"{"base": "paranoid"}"#).unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownPolicy { .. }));
    }

    #[test]
    fn test_catalog_register() {
        let mut catalog = PolicyCatalog::with_builtins();
        assert_eq!(catalog.names().len(), 5);

        let custom = Policy::strict().derive([("min_power", 0.9)]).unwrap();
        catalog.register(custom.clone()).unwrap();
        assert_eq!(catalog.get("custom").unwrap(), custom);

        let err = catalog.register(custom).unwrap_err();
        assert!(matches!(err, StatGuardError::DuplicatePolicy { .. }));
    }
}
