//! Descriptive analysis that sits beside validation.
//!
//! - [`profiler`]: per-column statistics, correlations and warnings for a
//!   whole dataset
//! - [`drift`]: two-sample comparison of one column across datasets
//!
//! Neither produces violations or depends on a policy; both reuse the
//! primitives in [`crate::stats`].

pub mod drift;
pub mod profiler;

pub use drift::{ComparisonResult, Comparator, SampleStats, TestOutcome, DEFAULT_DRIFT_ALPHA};
pub use profiler::{
    CategoryCount, ColumnProfile, DatasetProfile, DatasetProfiler, ProfileOptions, ProfileWarning,
    ProfileWarningKind,
};
