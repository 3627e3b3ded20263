//! Statistical primitives shared by checks, profiling and comparison.
//!
//! Everything here is a pure function over slices of finite `f64` values;
//! callers filter nulls and non-finite values first.

pub mod descriptive;
pub mod distributions;
pub mod hypothesis;
pub mod regression;

pub use descriptive::{
    cohens_d, describe, excess_kurtosis, interpret_effect_size, mean, median, pearson, quantile,
    quantile_sorted, skewness, sorted, std_dev, unique_count, variance, Summary, MIN_SHAPE_SAMPLE,
};
pub use distributions::{normal_cdf, normal_ppf, normal_sf};
pub use hypothesis::{
    ks_two_sample, levene, shapiro_wilk, t_test, two_sample_power, TestResult, SHAPIRO_MAX_N,
};
pub use regression::{correlation_matrix, invert, variance_inflation_factors};
