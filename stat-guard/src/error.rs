//! Error types for the StatGuard validation library.
//!
//! All fallible operations return [`StatGuardError`]. The variants fall into
//! three groups:
//!
//! - **Configuration errors** describe an ill-formed validation request (a
//!   column that does not exist, a parameter no policy defines, a duplicate
//!   check code). They are raised before any check executes.
//! - **Check evaluation errors** are produced inside a single check. The
//!   engine contains them and reports them as data (see
//!   [`INTERNAL_FAILURE_CODE`](crate::core::INTERNAL_FAILURE_CODE)).
//! - **Plumbing errors** wrap Arrow, I/O and serialization failures.

use thiserror::Error;

/// The main error type for the StatGuard library.
#[derive(Error, Debug)]
pub enum StatGuardError {
    /// A requested column is not present in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A check was registered under a code that is already taken.
    #[error("Check code '{code}' is already registered")]
    DuplicateCheckCode { code: String },

    /// No check is registered under the requested code.
    #[error("Unknown check code '{code}'")]
    UnknownCheckCode { code: String },

    /// Neither the policy nor its base defines the parameter.
    #[error("Unknown policy parameter '{name}'")]
    UnknownParameter { name: String },

    /// A parameter exists but its value has the wrong type.
    #[error("Invalid value for parameter '{name}': expected {expected}, found {found}")]
    InvalidParameter {
        name: String,
        expected: String,
        found: String,
    },

    /// No built-in or registered policy has this name.
    #[error("Unknown policy '{name}'")]
    UnknownPolicy { name: String },

    /// A policy with this name is already registered.
    #[error("Policy '{name}' is already registered")]
    DuplicatePolicy { name: String },

    /// A check failed while evaluating data.
    #[error("Check '{check}' failed: {message}")]
    CheckEvaluation {
        /// Code of the failing check
        check: String,
        /// Detailed error message
        message: String,
    },

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error while writing formatted output.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, StatGuardError>`.
pub type Result<T> = std::result::Result<T, StatGuardError>;

impl StatGuardError {
    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates an unknown-parameter error.
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Self::UnknownParameter { name: name.into() }
    }

    /// Creates an invalid-parameter error.
    pub fn invalid_parameter(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a check evaluation error.
    pub fn check_evaluation(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CheckEvaluation {
            check: check.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors that describe an ill-formed validation request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ColumnNotFound { .. }
                | Self::DuplicateCheckCode { .. }
                | Self::UnknownCheckCode { .. }
                | Self::UnknownParameter { .. }
                | Self::InvalidParameter { .. }
                | Self::UnknownPolicy { .. }
                | Self::DuplicatePolicy { .. }
                | Self::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for StatGuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<StatGuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

fn wrap(msg: &str, err: StatGuardError) -> StatGuardError {
    match err {
        // Configuration errors keep their kind so callers can still match on them.
        err if err.is_configuration() => err,
        StatGuardError::Internal(inner) => StatGuardError::Internal(format!("{msg}: {inner}")),
        other => StatGuardError::Internal(format!("{msg}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_not_found() {
        let err = StatGuardError::column_not_found("revenue");
        assert_eq!(err.to_string(), "Column 'revenue' not found in dataset");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_parameter() {
        let err = StatGuardError::invalid_parameter("max_smd", "number", "text");
        assert_eq!(
            err.to_string(),
            "Invalid value for parameter 'max_smd': expected number, found text"
        );
    }

    #[test]
    fn test_check_evaluation_is_not_configuration() {
        let err = StatGuardError::check_evaluation("SG205", "matrix is singular");
        assert_eq!(err.to_string(), "Check 'SG205' failed: matrix is singular");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(StatGuardError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("While loading dataset")
            .unwrap_err();
        assert!(err.to_string().contains("While loading dataset"));
    }

    #[test]
    fn test_error_context_preserves_configuration_errors() {
        let result: Result<()> = Err(StatGuardError::UnknownPolicy {
            name: "paranoid".to_string(),
        });
        let err = result.with_context(|| "resolving policy".to_string()).unwrap_err();
        assert!(matches!(err, StatGuardError::UnknownPolicy { .. }));
    }
}
