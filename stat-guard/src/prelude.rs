//! Prelude for commonly used types and traits in stat-guard.

pub use crate::core::{Check, ColumnRoles, DatasetView, Policy, Report, Severity, Violation};
pub use crate::error::{ErrorContext, Result, StatGuardError};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
