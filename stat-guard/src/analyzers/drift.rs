//! Two-sample comparison of one numeric column across datasets.
//!
//! Three tests look at different kinds of drift: Kolmogorov-Smirnov for the
//! whole distribution, a pooled Student t-test for the mean and Levene's
//! median-centred test for the spread. Drift is reported when any of them is
//! significant.

use crate::core::{ColumnKind, DatasetView};
use crate::prelude::*;
use crate::stats::{self, TestResult};
use serde::Serialize;
use std::fmt::Write;
use tracing::{info, instrument};

/// Significance level used unless configured otherwise.
pub const DEFAULT_DRIFT_ALPHA: f64 = 0.05;

/// Count, mean and standard deviation of one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl SampleStats {
    fn of(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            mean: stats::mean(values),
            std: stats::std_dev(values),
        }
    }
}

/// Outcome of one hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

impl TestOutcome {
    fn at(result: TestResult, alpha: f64) -> Self {
        Self {
            statistic: result.statistic,
            p_value: result.p_value,
            significant: result.is_significant(alpha),
        }
    }
}

/// Result of comparing a column between two datasets.
///
/// A test is `None` when the samples cannot support it, e.g. fewer than two
/// values on a side or no spread at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub target: String,
    /// (rows, columns) of the first dataset
    pub shape_a: (usize, usize),
    /// (rows, columns) of the second dataset
    pub shape_b: (usize, usize),
    pub stats_a: SampleStats,
    pub stats_b: SampleStats,
    pub alpha: f64,
    pub ks_test: Option<TestOutcome>,
    pub t_test: Option<TestOutcome>,
    pub levene_test: Option<TestOutcome>,
    pub drift_detected: bool,
}

impl ComparisonResult {
    /// Serializes the result as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders a plain-text summary for terminals.
    pub fn to_human(&self) -> Result<String> {
        let mut output = String::new();
        let side = |stats: &SampleStats| {
            let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
            format!("n={} mean={} std={}", stats.count, fmt(stats.mean), fmt(stats.std))
        };

        writeln!(output, "Comparing '{}'", self.target)?;
        writeln!(output, "   A: {} rows x {} columns, {}", self.shape_a.0, self.shape_a.1, side(&self.stats_a))?;
        writeln!(output, "   B: {} rows x {} columns, {}", self.shape_b.0, self.shape_b.1, side(&self.stats_b))?;
        writeln!(output)?;
        for (name, test) in [
            ("Kolmogorov-Smirnov", &self.ks_test),
            ("t-test", &self.t_test),
            ("Levene", &self.levene_test),
        ] {
            match test {
                Some(test) => writeln!(
                    output,
                    "   {name}: statistic={:.4} p={:.4}{}",
                    test.statistic,
                    test.p_value,
                    if test.significant { " (significant)" } else { "" }
                )?,
                None => writeln!(output, "   {name}: not applicable")?,
            }
        }
        writeln!(output)?;
        if self.drift_detected {
            writeln!(output, "Drift detected at alpha={}", self.alpha)?;
        } else {
            writeln!(output, "No drift detected at alpha={}", self.alpha)?;
        }
        Ok(output)
    }
}

/// Compares a numeric column between two datasets.
///
/// # Examples
///
/// ```rust
/// use arrow::array::{ArrayRef, Float64Array};
/// use stat_guard::analyzers::Comparator;
/// use stat_guard::core::DatasetView;
/// use std::sync::Arc;
///
/// let column = |values: Vec<f64>| {
///     DatasetView::try_from_columns(vec![("y", Arc::new(Float64Array::from(values)) as ArrayRef)]).unwrap()
/// };
/// let before = column((0..50).map(|i| f64::from(i % 10)).collect());
/// let after = column((0..50).map(|i| f64::from(i % 10) + 20.0).collect());
///
/// let result = Comparator::new().compare(&before, &after, "y").unwrap();
/// assert!(result.drift_detected);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    alpha: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// Creates a comparator at the default significance level.
    pub fn new() -> Self {
        Self {
            alpha: DEFAULT_DRIFT_ALPHA,
        }
    }

    /// Sets the significance level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Compares `target` between `a` and `b`.
    ///
    /// Fails if either dataset lacks the column or holds it as non-numeric.
    #[instrument(skip(self, a, b), fields(alpha = self.alpha))]
    pub fn compare(&self, a: &DatasetView, b: &DatasetView, target: &str) -> Result<ComparisonResult> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(StatGuardError::Configuration(format!(
                "Significance level must be in (0, 1), got {}",
                self.alpha
            )));
        }
        let xs = numeric_target(a, target)?;
        let ys = numeric_target(b, target)?;

        let ks_test = stats::ks_two_sample(&xs, &ys).map(|r| TestOutcome::at(r, self.alpha));
        let t_test = stats::t_test(&xs, &ys).map(|r| TestOutcome::at(r, self.alpha));
        let levene_test = stats::levene(&[&xs, &ys]).map(|r| TestOutcome::at(r, self.alpha));
        let drift_detected = [ks_test, t_test, levene_test]
            .iter()
            .flatten()
            .any(|test| test.significant);

        info!(
            target,
            drift_detected,
            n_a = xs.len(),
            n_b = ys.len(),
            "Completed two-sample comparison"
        );

        Ok(ComparisonResult {
            target: target.to_string(),
            shape_a: (a.row_count(), a.column_count()),
            shape_b: (b.row_count(), b.column_count()),
            stats_a: SampleStats::of(&xs),
            stats_b: SampleStats::of(&ys),
            alpha: self.alpha,
            ks_test,
            t_test,
            levene_test,
            drift_detected,
        })
    }
}

fn numeric_target(view: &DatasetView, target: &str) -> Result<Vec<f64>> {
    let kind = view.column_kind(target)?;
    if kind != ColumnKind::Numeric {
        return Err(StatGuardError::Configuration(format!(
            "Column '{target}' is {kind}, comparison needs a numeric column"
        )));
    }
    view.present_numeric(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use std::sync::Arc;

    fn view(values: Vec<f64>) -> DatasetView {
        DatasetView::try_from_columns(vec![("y", Arc::new(Float64Array::from(values)) as ArrayRef)]).unwrap()
    }

    fn wave(n: usize, shift: f64, scale: f64) -> Vec<f64> {
        (0..n).map(|i| shift + scale * ((i * 7) % 23) as f64).collect()
    }

    #[test]
    fn test_identical_samples_show_no_drift() {
        let a = view(wave(200, 0.0, 1.0));
        let result = Comparator::new().compare(&a, &a, "y").unwrap();

        assert!(!result.drift_detected);
        let ks = result.ks_test.unwrap();
        assert_eq!(ks.statistic, 0.0);
        assert!(!ks.significant);
        assert!(result.t_test.unwrap().statistic.abs() < 1e-12);
        assert_eq!(result.stats_a, result.stats_b);
    }

    #[test]
    fn test_shifted_mean_is_drift() {
        let a = view(wave(200, 0.0, 1.0));
        let b = view(wave(200, 5.0, 1.0));
        let result = Comparator::new().compare(&a, &b, "y").unwrap();

        assert!(result.drift_detected);
        assert!(result.t_test.unwrap().significant);
        assert!(result.ks_test.unwrap().significant);
        assert_eq!(result.shape_a, (200, 1));
    }

    #[test]
    fn test_wider_spread_is_drift() {
        let a = view(wave(300, 0.0, 1.0));
        // Same centre (11), three times the spread.
        let b = view(wave(300, -22.0, 3.0));
        let result = Comparator::new().compare(&a, &b, "y").unwrap();

        assert!(result.levene_test.unwrap().significant);
        assert!(result.drift_detected);
    }

    #[test]
    fn test_tiny_samples_skip_tests() {
        let result = Comparator::new()
            .compare(&view(vec![1.0]), &view(vec![2.0]), "y")
            .unwrap();
        assert!(result.t_test.is_none());
        assert!(result.levene_test.is_none());
        assert!(result.ks_test.is_some());
        assert!(!result.drift_detected);
    }

    #[test]
    fn test_rejects_bad_input() {
        let numeric = view(vec![1.0, 2.0]);
        let text = DatasetView::try_from_columns(vec![(
            "y",
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
        )])
        .unwrap();

        let err = Comparator::new().compare(&numeric, &text, "y").unwrap_err();
        assert!(err.is_configuration());
        let err = Comparator::new().compare(&numeric, &numeric, "z").unwrap_err();
        assert!(matches!(err, StatGuardError::ColumnNotFound { .. }));
        assert!(Comparator::new().alpha(1.5).compare(&numeric, &numeric, "y").is_err());
    }

    #[test]
    fn test_render() {
        let a = view(wave(50, 0.0, 1.0));
        let result = Comparator::new().compare(&a, &a, "y").unwrap();
        let text = result.to_human().unwrap();
        assert!(text.contains("Comparing 'y'"));
        assert!(text.contains("No drift detected"));
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["drift_detected"], false);
        assert_eq!(json["shape_a"], serde_json::json!([50, 1]));
    }
}
