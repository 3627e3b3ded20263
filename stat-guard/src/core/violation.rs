//! Findings produced by checks.

use super::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single finding emitted by a check.
///
/// Violations are ordinary output of a validation run, not errors: the engine
/// collects them in execution order and derives the report verdict from their
/// severities.
///
/// # Examples
///
/// ```rust
/// use stat_guard::core::{Severity, Violation};
///
/// let violation = Violation::new("SG203", Severity::Warning, "Target is right-skewed")
///     .with_suggestion("Consider a log transform")
///     .with_context("skewness", 2.7);
///
/// assert!(!violation.is_error());
/// assert_eq!(violation.context["skewness"], 2.7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Code of the check that produced the violation
    pub code: String,
    /// Human-readable name of that check
    #[serde(default)]
    pub check_name: String,
    /// Severity of this instance
    pub severity: Severity,
    /// Description of the finding
    pub message: String,
    /// Optional remediation hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Diagnostic values keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

impl Violation {
    /// Creates a violation without suggestion or context.
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            check_name: String::new(),
            severity,
            message: message.into(),
            suggestion: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the name of the producing check.
    pub fn with_check_name(mut self, name: impl Into<String>) -> Self {
        self.check_name = name.into();
        self
    }

    /// Sets the remediation hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds one diagnostic value. Non-finite floats serialize as `null`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns true if this violation invalidates a report.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let violation = Violation::new("SG101", Severity::Error, "Sample size 12 below 30")
            .with_check_name("Minimum Sample Size")
            .with_context("n", 12)
            .with_context("groups", json!({"a": 5, "b": 7}));

        assert!(violation.is_error());
        assert_eq!(violation.check_name, "Minimum Sample Size");
        assert_eq!(violation.context["groups"]["b"], 7);
        assert!(violation.suggestion.is_none());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let violation = Violation::new("SG302", Severity::Error, "4 duplicate rows");
        let json = serde_json::to_string(&violation).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("context"));
        assert!(json.contains("\"severity\":\"error\""));
    }

    #[test]
    fn test_non_finite_context_is_null() {
        let violation = Violation::new("SG402", Severity::Error, "singular")
            .with_context("vif", f64::INFINITY);
        assert_eq!(violation.context["vif"], Value::Null);
    }
}
