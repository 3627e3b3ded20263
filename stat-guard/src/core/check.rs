//! The check abstraction shared by built-in and user-defined checks.

use super::{ColumnKind, ColumnRoles, DatasetView, Params, Role, Severity, Violation};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family a check belongs to; mirrors the hundreds digit of built-in codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    SampleSize,
    Distribution,
    Integrity,
    Correlation,
    Outliers,
    MissingData,
    Cardinality,
    Custom,
}

impl CheckCategory {
    /// Returns the string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::SampleSize => "sample_size",
            CheckCategory::Distribution => "distribution",
            CheckCategory::Integrity => "integrity",
            CheckCategory::Correlation => "correlation",
            CheckCategory::Outliers => "outliers",
            CheckCategory::MissingData => "missing_data",
            CheckCategory::Cardinality => "cardinality",
            CheckCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the engine did not run a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum SkipReason {
    /// A required role is not bound
    MissingRole { role: Role },
    /// The target column is not numeric
    NonNumericTarget { column: String, kind: ColumnKind },
    /// The dataset has too few rows
    InsufficientRows { required: usize, actual: usize },
    /// The group column has the wrong number of distinct groups
    GroupCount { required: String, actual: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingRole { role } => write!(f, "no {role} column bound"),
            SkipReason::NonNumericTarget { column, kind } => {
                write!(f, "target column '{column}' is {kind}, not numeric")
            }
            SkipReason::InsufficientRows { required, actual } => {
                write!(f, "requires at least {required} rows, dataset has {actual}")
            }
            SkipReason::GroupCount { required, actual } => {
                write!(f, "requires {required} groups, found {actual}")
            }
        }
    }
}

/// What a check needs from the dataset and role bindings before it can run.
///
/// The engine evaluates requirements and skips unsatisfied checks without
/// emitting violations.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::{Requirements, Role};
///
/// let requirements = Requirements::new()
///     .numeric_target()
///     .exact_groups(2)
///     .min_rows(4);
///
/// assert!(requirements.roles().contains(&Role::Target));
/// assert!(requirements.roles().contains(&Role::Group));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    roles: Vec<Role>,
    numeric_target: bool,
    min_rows: usize,
    min_groups: Option<usize>,
    exact_groups: Option<usize>,
}

impl Requirements {
    /// No requirements at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a role to be bound.
    pub fn role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Requires a bound, numeric target column.
    pub fn numeric_target(mut self) -> Self {
        self.numeric_target = true;
        self.role(Role::Target)
    }

    /// Requires at least `rows` rows.
    pub fn min_rows(mut self, rows: usize) -> Self {
        self.min_rows = rows;
        self
    }

    /// Requires a group column with at least `groups` distinct labels.
    pub fn min_groups(mut self, groups: usize) -> Self {
        self.min_groups = Some(groups);
        self.role(Role::Group)
    }

    /// Requires a group column with exactly `groups` distinct labels.
    pub fn exact_groups(mut self, groups: usize) -> Self {
        self.exact_groups = Some(groups);
        self.role(Role::Group)
    }

    /// Returns the required roles.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Returns the first unmet requirement, or `None` if the check can run.
    pub fn unmet(&self, view: &DatasetView, roles: &ColumnRoles) -> Result<Option<SkipReason>> {
        for role in &self.roles {
            if roles.get(*role).is_none() {
                return Ok(Some(SkipReason::MissingRole { role: *role }));
            }
        }

        if view.row_count() < self.min_rows {
            return Ok(Some(SkipReason::InsufficientRows {
                required: self.min_rows,
                actual: view.row_count(),
            }));
        }

        if self.numeric_target {
            if let Some(target) = roles.target() {
                let kind = view.column_kind(target)?;
                if kind != ColumnKind::Numeric {
                    return Ok(Some(SkipReason::NonNumericTarget {
                        column: target.to_string(),
                        kind,
                    }));
                }
            }
        }

        if self.min_groups.is_some() || self.exact_groups.is_some() {
            if let Some(group) = roles.group() {
                let actual = view.group_sizes(group)?.len();
                if let Some(min) = self.min_groups.filter(|min| actual < *min) {
                    return Ok(Some(SkipReason::GroupCount {
                        required: format!("at least {min}"),
                        actual,
                    }));
                }
                if let Some(exact) = self.exact_groups.filter(|exact| actual != *exact) {
                    return Ok(Some(SkipReason::GroupCount {
                        required: format!("exactly {exact}"),
                        actual,
                    }));
                }
            }
        }

        Ok(None)
    }
}

/// Static description of a registered check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDescriptor {
    pub code: String,
    pub name: String,
    pub category: CheckCategory,
    pub description: String,
    pub parameters: Vec<String>,
}

/// A single validation rule identified by a stable code.
///
/// Checks must be deterministic: identical inputs produce identical
/// violations in the same order. A check reports findings only under its own
/// code; the engine attributes every returned violation to the check that
/// produced it.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::{
///     Check, CheckCategory, ColumnRoles, DatasetView, Params, Requirements, Severity, Violation,
/// };
/// use stat_guard::prelude::*;
///
/// #[derive(Debug)]
/// struct NonNegativeTarget;
///
/// impl Check for NonNegativeTarget {
///     fn code(&self) -> &str {
///         "CU001"
///     }
///
///     fn name(&self) -> &str {
///         "Non-negative Target"
///     }
///
///     fn requirements(&self) -> Requirements {
///         Requirements::new().numeric_target()
///     }
///
///     fn evaluate(
///         &self,
///         view: &DatasetView,
///         roles: &ColumnRoles,
///         _params: &Params,
///     ) -> Result<Vec<Violation>> {
///         let target = roles.target().unwrap_or_default();
///         let negatives = view.present_numeric(target)?.iter().filter(|v| **v < 0.0).count();
///         if negatives == 0 {
///             return Ok(vec![]);
///         }
///         Ok(vec![self
///             .violation(Severity::Error, format!("{negatives} negative values"))
///             .with_context("count", negatives)])
///     }
/// }
/// ```
pub trait Check: fmt::Debug + Send + Sync {
    /// Returns the stable code, e.g. `SG101`.
    fn code(&self) -> &str;

    /// Returns the human-readable name.
    fn name(&self) -> &str;

    /// Returns the family the check belongs to.
    fn category(&self) -> CheckCategory {
        CheckCategory::Custom
    }

    /// Returns a one-line description.
    fn description(&self) -> &str {
        ""
    }

    /// Returns what the check needs before it can run.
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    /// Returns the policy parameters the check reads.
    fn parameters(&self) -> &[&'static str] {
        &[]
    }

    /// Evaluates the check. Returning `Err` marks an internal failure, not a
    /// data problem.
    fn evaluate(
        &self,
        view: &DatasetView,
        roles: &ColumnRoles,
        params: &Params,
    ) -> Result<Vec<Violation>>;

    /// Starts a violation attributed to this check.
    fn violation(&self, severity: Severity, message: impl Into<String>) -> Violation
    where
        Self: Sized,
    {
        Violation::new(self.code(), severity, message).with_check_name(self.name())
    }

    /// Returns the static description used for listings.
    fn descriptor(&self) -> CheckDescriptor {
        CheckDescriptor {
            code: self.code().to_string(),
            name: self.name().to_string(),
            category: self.category(),
            description: self.description().to_string(),
            parameters: self.parameters().iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use std::sync::Arc;

    fn view() -> DatasetView {
        DatasetView::try_from_columns(vec![
            (
                "y",
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])) as ArrayRef,
            ),
            (
                "arm",
                Arc::new(StringArray::from(vec!["a", "a", "a"])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_role_is_reported_first() {
        let reason = Requirements::new()
            .numeric_target()
            .min_groups(2)
            .unmet(&view(), &ColumnRoles::new().with_target("y"))
            .unwrap();
        assert_eq!(reason, Some(SkipReason::MissingRole { role: Role::Group }));
    }

    #[test]
    fn test_non_numeric_target() {
        let reason = Requirements::new()
            .numeric_target()
            .unmet(&view(), &ColumnRoles::new().with_target("arm"))
            .unwrap();
        assert!(matches!(reason, Some(SkipReason::NonNumericTarget { .. })));
    }

    #[test]
    fn test_skip_reason_json_keeps_column_kind() {
        let reason = SkipReason::NonNumericTarget {
            column: "arm".to_string(),
            kind: ColumnKind::Categorical,
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["cause"], "non_numeric_target");
        assert_eq!(json["column"], "arm");
        assert_eq!(json["kind"], "categorical");

        let back: SkipReason = serde_json::from_value(json).unwrap();
        assert_eq!(back, reason);
    }

    #[test]
    fn test_row_and_group_counts() {
        let roles = ColumnRoles::new().with_target("y").with_group("arm");
        let rows = Requirements::new().min_rows(10).unmet(&view(), &roles).unwrap();
        assert_eq!(
            rows,
            Some(SkipReason::InsufficientRows {
                required: 10,
                actual: 3
            })
        );

        let groups = Requirements::new().min_groups(2).unmet(&view(), &roles).unwrap();
        assert_eq!(
            groups.map(|r| r.to_string()),
            Some("requires at least 2 groups, found 1".to_string())
        );

        assert_eq!(Requirements::new().exact_groups(1).unmet(&view(), &roles).unwrap(), None);
    }
}
