//! Core validation types for the StatGuard library.
//!
//! ## Overview
//!
//! - **[`DatasetView`]**: read-only typed access to an Arrow table
//! - **[`Check`]**: a single rule identified by a stable code
//! - **[`Policy`]**: an immutable bundle of thresholds and disabled checks
//! - **[`CheckRegistry`]**: the catalog of checks keyed by code
//! - **[`ValidationEngine`]**: runs the registry against a dataset
//! - **[`Report`]**: the aggregated, immutable outcome
//!
//! ## Architecture
//!
//! ```text
//! DatasetView + ColumnRoles + Policy
//!         │
//!         ▼
//! ValidationEngine ── CheckRegistry (SG101 … SG705, user checks)
//!         │
//!         ▼
//!      Report ── violations (execution order), summary, skipped checks
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use stat_guard::core::{ColumnRoles, DatasetView, Policy, ValidationEngine};
//! use std::sync::Arc;
//!
//! let revenue: Vec<f64> = (0..60).map(|i| 10.0 + (i % 7) as f64).collect();
//! let arms: Vec<&str> = (0..60).map(|i| if i % 2 == 0 { "control" } else { "treatment" }).collect();
//!
//! let view = DatasetView::try_from_columns(vec![
//!     ("revenue", Arc::new(Float64Array::from(revenue)) as ArrayRef),
//!     ("arm", Arc::new(StringArray::from(arms)) as ArrayRef),
//! ])
//! .unwrap();
//!
//! let roles = ColumnRoles::new().with_target("revenue").with_group("arm");
//! let report = ValidationEngine::default()
//!     .run(&view, &Policy::lenient(), &roles)
//!     .unwrap();
//!
//! for violation in report.violations() {
//!     println!("[{}] {}: {}", violation.severity, violation.code, violation.message);
//! }
//! ```

pub mod check;
pub mod dataset;
pub mod engine;
pub mod policy;
pub mod registry;
pub mod report;
pub mod roles;
pub mod severity;
pub mod violation;

pub use check::{Check, CheckCategory, CheckDescriptor, Requirements, SkipReason};
pub use dataset::{ColumnKind, DatasetView};
pub use engine::{
    CancellationToken, EngineConfig, ValidationEngine, ValidationEngineBuilder, INTERNAL_FAILURE_CODE,
};
pub use policy::{
    ParamValue, Params, Policy, PolicyBuilder, PolicyCatalog, PolicyFile, BUILTIN_POLICIES,
};
pub use registry::CheckRegistry;
pub use report::{Report, ReportParts, RunMetadata, SeveritySummary, SkippedCheck, TargetSummary};
pub use roles::{ColumnRoles, Role};
pub use severity::Severity;
pub use violation::Violation;
