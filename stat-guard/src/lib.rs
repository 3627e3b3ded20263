//! # StatGuard - statistical validation for tabular data
//!
//! StatGuard checks a dataset before it is used in an analysis or an
//! experiment readout. A policy of thresholds drives a catalog of statistical
//! checks (sample size, distribution shape, integrity, outliers, correlation,
//! missing data and cardinality), and every finding is reported as a
//! severity-ranked violation with a stable code.
//!
//! ## Quick Start
//!
//! ```rust
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use stat_guard::core::{ColumnRoles, DatasetView, Policy, ValidationEngine};
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
//! let roles = ColumnRoles::new().with_target("revenue").with_group("arm");
//! let report = ValidationEngine::default()
//!     .run(&view, &Policy::experiment(), &roles)
//!     .unwrap();
//!
//! if !report.is_valid() {
//!     for violation in report.errors() {
//!         eprintln!("[{}] {}", violation.code, violation.message);
//!     }
//! }
//! ```
//!
//! ## Policies
//!
//! Five policies are built in: `default`, `strict`, `lenient`, `experiment`
//! and `time_series`. Custom policies derive from one of them:
//!
//! ```rust
//! use stat_guard::core::Policy;
//!
//! let policy = Policy::strict()
//!     .derive([("min_sample_size", 500)])
//!     .unwrap();
//! assert_eq!(policy.base(), Some("strict"));
//! ```
//!
//! ## Custom Checks
//!
//! Implement [`core::Check`] and register it with a
//! [`core::CheckRegistry`]; user codes must not collide with the `SG` codes.
//!
//! ## Architecture
//!
//! - **`core`**: dataset view, checks, policies, registry, engine and report
//! - **`checks`**: the built-in SG1xx to SG7xx catalog
//! - **`stats`**: descriptive statistics, hypothesis tests, regression helpers
//! - **`formatters`**: JSON, human, Markdown and HTML report rendering
//! - **`analyzers`**: dataset profiling and two-sample drift comparison
//! - **`sources`**: CSV loading
//! - **`api`**: one-call entry points over the global registry and catalog
//! - **`logging`**: log configuration and subscriber setup

pub mod analyzers;
pub mod api;
pub mod checks;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod sources;
pub mod stats;
