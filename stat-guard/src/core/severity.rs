//! Violation severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a single violation.
///
/// Levels are ordered by impact: `Error > Warning > Info`. Only
/// [`Severity::Error`] invalidates a report; warnings and informational
/// findings are surfaced to the user but never flip validity.
///
/// # Usage Guidelines
///
/// - **Error**: the dataset cannot support the intended analysis
///   - Sample too small, zero variance in the target
///   - Duplicate units or units leaking across groups
///   - Perfectly correlated features
///
/// - **Warning**: assumptions are strained and results need care
///   - Skewed or heavy-tailed distributions
///   - Unequal group variances
///   - Moderate outlier share
///
/// - **Info**: observations worth knowing
///   - Negligible effect sizes
///   - Features uncorrelated with the target
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::Severity;
///
/// assert!(Severity::Error > Severity::Warning);
/// assert!(Severity::Warning > Severity::Info);
/// assert!(Severity::Warning.is_at_least(Severity::Info));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding
    Info = 0,
    /// Potential issue that should be reviewed
    #[default]
    Warning = 1,
    /// Issue that invalidates the dataset for analysis
    Error = 2,
}

impl Severity {
    /// All severities, least severe first.
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Returns the upper-case label used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// Checks if this severity is at least as high as another one.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
