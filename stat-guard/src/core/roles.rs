//! Column role bindings for a validation run.

use super::DatasetView;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The part a column plays in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The outcome being analysed
    Target,
    /// Treatment / experiment arm
    Group,
    /// Unit of randomisation or observation identifier
    Unit,
    /// Timestamp column for time-ordered data
    Time,
}

impl Role {
    /// Returns the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Target => "target",
            Role::Group => "group",
            Role::Unit => "unit",
            Role::Time => "time",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional column bindings for target, group, unit and time roles.
///
/// A role may be left unbound; checks that need it are skipped. Bound roles
/// must name existing columns, which [`ColumnRoles::validate`] enforces before
/// a run starts. The same column may fill several roles.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::{ColumnRoles, Role};
///
/// let roles = ColumnRoles::new().with_target("revenue").with_group("arm");
/// assert_eq!(roles.get(Role::Group), Some("arm"));
/// assert!(roles.get(Role::Unit).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl ColumnRoles {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the target column.
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target = Some(column.into());
        self
    }

    /// Binds the group column.
    pub fn with_group(mut self, column: impl Into<String>) -> Self {
        self.group = Some(column.into());
        self
    }

    /// Binds the unit column.
    pub fn with_unit(mut self, column: impl Into<String>) -> Self {
        self.unit = Some(column.into());
        self
    }

    /// Binds the time column.
    pub fn with_time(mut self, column: impl Into<String>) -> Self {
        self.time = Some(column.into());
        self
    }

    /// Returns the column bound to a role.
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Target => self.target.as_deref(),
            Role::Group => self.group.as_deref(),
            Role::Unit => self.unit.as_deref(),
            Role::Time => self.time.as_deref(),
        }
    }

    /// Returns the target column, if bound.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns the group column, if bound.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Returns the unit column, if bound.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Returns the time column, if bound.
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    /// Returns every bound `(role, column)` pair.
    pub fn bound(&self) -> Vec<(Role, &str)> {
        [Role::Target, Role::Group, Role::Unit, Role::Time]
            .into_iter()
            .filter_map(|role| self.get(role).map(|column| (role, column)))
            .collect()
    }

    /// Returns true if `column` fills any role.
    pub fn is_bound(&self, column: &str) -> bool {
        self.bound().iter().any(|(_, bound)| *bound == column)
    }

    /// Fails with `ColumnNotFound` if a bound role names a missing column.
    pub fn validate(&self, view: &DatasetView) -> Result<()> {
        for (_, column) in self.bound() {
            if !view.has_column(column) {
                return Err(StatGuardError::column_not_found(column));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array};
    use std::sync::Arc;

    fn view() -> DatasetView {
        DatasetView::try_from_columns(vec![(
            "y",
            Arc::new(Float64Array::from(vec![1.0, 2.0])) as ArrayRef,
        )])
        .unwrap()
    }

    #[test]
    fn test_bound_roles() {
        let roles = ColumnRoles::new().with_target("y").with_group("y");
        assert_eq!(roles.bound(), vec![(Role::Target, "y"), (Role::Group, "y")]);
        assert!(roles.is_bound("y"));
        assert!(!roles.is_bound("x"));
    }

    #[test]
    fn test_validate_rejects_missing_column() {
        assert!(ColumnRoles::new().with_target("y").validate(&view()).is_ok());

        let err = ColumnRoles::new()
            .with_target("y")
            .with_unit("user_id")
            .validate(&view())
            .unwrap_err();
        assert!(matches!(err, StatGuardError::ColumnNotFound { column } if column == "user_id"));
    }
}
