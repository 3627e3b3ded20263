//! Dataset profiling.
//!
//! The profiler makes one pass per column, in parallel across columns:
//!
//! - counts of rows, nulls and distinct values (null counts as a value)
//! - descriptive statistics for numeric columns
//! - the most frequent labels for categorical columns
//!
//! It then adds dataset-level missingness, optional pairwise Pearson
//! correlations and a list of warnings derived from the column profiles.
//!
//! # Example
//!
//! ```rust
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use stat_guard::analyzers::{DatasetProfiler, ProfileOptions};
//! use stat_guard::core::DatasetView;
//! use std::sync::Arc;
//!
//! let view = DatasetView::try_from_columns(vec![
//!     ("revenue", Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])) as ArrayRef),
//!     ("arm", Arc::new(StringArray::from(vec!["a", "b", "a", "b"])) as ArrayRef),
//! ])
//! .unwrap();
//!
//! let profile = DatasetProfiler::new(ProfileOptions::default()).profile(&view).unwrap();
//! assert_eq!(profile.numeric_columns, vec!["revenue"]);
//! assert_eq!(profile.column("arm").unwrap().unique_count, 2);
//! ```

use crate::core::{ColumnKind, DatasetView, Severity};
use crate::prelude::*;
use crate::stats::{self, Summary};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::time::Instant;
use tracing::{info, instrument};

/// Label shown for null cells among top categories.
const MISSING_LABEL: &str = "(missing)";

/// Configuration for [`DatasetProfiler`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOptions {
    /// Compute pairwise correlations between numeric columns
    pub compute_correlations: bool,
    /// Number of most frequent labels kept per categorical column
    pub max_categories: usize,
    /// Missing fraction above which a column is flagged
    pub missing_warning_pct: f64,
    /// Distinct fraction above which a categorical column looks like an id
    pub high_cardinality_pct: f64,
    /// Absolute skewness above which a numeric column is flagged
    pub skewness_warning: f64,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            compute_correlations: true,
            max_categories: 10,
            missing_warning_pct: 0.5,
            high_cardinality_pct: 0.9,
            skewness_warning: 3.0,
        }
    }
}

impl ProfileOptions {
    /// Sets whether correlations are computed.
    pub fn with_correlations(mut self, enabled: bool) -> Self {
        self.compute_correlations = enabled;
        self
    }

    /// Sets the number of top categories kept.
    pub fn with_max_categories(mut self, max: usize) -> Self {
        self.max_categories = max;
        self
    }
}

/// One frequent label of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
    /// Share of all rows, in percent
    pub percentage: f64,
}

/// Statistics of a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Arrow data type as text
    pub data_type: String,
    /// Number of rows, nulls included
    pub count: usize,
    pub missing_count: usize,
    pub missing_pct: f64,
    /// Distinct values, with null counted as one value
    pub unique_count: usize,
    pub unique_pct: f64,
    pub is_constant: bool,
    /// Descriptive statistics of the finite values (numeric columns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<Summary>,
    /// Most frequent labels (categorical columns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_categories: Option<Vec<CategoryCount>>,
}

/// What a profile warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileWarningKind {
    HighMissing,
    HighCardinality,
    Constant,
    HighSkewness,
    ZeroVariance,
}

/// A notable property of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileWarning {
    pub column: String,
    pub kind: ProfileWarningKind,
    pub message: String,
    pub severity: Severity,
}

/// Profile of a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub n_rows: usize,
    pub n_columns: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub other_columns: Vec<String>,
    pub total_missing_cells: usize,
    pub missing_cell_pct: f64,
    /// Rows without any null cell
    pub complete_rows: usize,
    pub complete_row_pct: f64,
    /// Column profiles in dataset order
    pub columns: Vec<ColumnProfile>,
    /// Pearson correlations between numeric columns, keyed by column name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    pub warnings: Vec<ProfileWarning>,
    pub created_at: String,
    pub profiling_time_ms: u64,
}

impl DatasetProfile {
    /// Returns the profile of the named column.
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns the warnings raised for one column.
    pub fn warnings_for(&self, column: &str) -> Vec<&ProfileWarning> {
        self.warnings.iter().filter(|w| w.column == column).collect()
    }

    /// Serializes the profile as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders a plain-text overview for terminals.
    pub fn to_human(&self) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Dataset: {} rows x {} columns", self.n_rows, self.n_columns)?;
        writeln!(
            output,
            "Missing cells: {} ({:.1}%)",
            self.total_missing_cells,
            self.missing_cell_pct * 100.0
        )?;
        writeln!(
            output,
            "Complete rows: {} ({:.1}%)",
            self.complete_rows,
            self.complete_row_pct * 100.0
        )?;

        for column in &self.columns {
            writeln!(output)?;
            writeln!(output, "{} ({}, {})", column.name, column.kind, column.data_type)?;
            writeln!(
                output,
                "   missing: {} ({:.1}%)  unique: {}",
                column.missing_count,
                column.missing_pct * 100.0,
                column.unique_count
            )?;
            if let Some(summary) = &column.numeric {
                let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
                writeln!(
                    output,
                    "   mean: {}  std: {}  min: {}  median: {}  max: {}",
                    fmt(summary.mean),
                    fmt(summary.std),
                    fmt(summary.min),
                    fmt(summary.median),
                    fmt(summary.max)
                )?;
            }
            if let Some(categories) = &column.top_categories {
                let top: Vec<String> = categories
                    .iter()
                    .map(|c| format!("{} ({})", c.value, c.count))
                    .collect();
                writeln!(output, "   top: {}", top.join(", "))?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(output)?;
            writeln!(output, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(output, "   [{}] {}: {}", warning.severity, warning.column, warning.message)?;
            }
        }
        Ok(output)
    }
}

/// Builds [`DatasetProfile`]s.
#[derive(Debug, Clone, Default)]
pub struct DatasetProfiler {
    options: ProfileOptions,
}

impl DatasetProfiler {
    /// Creates a profiler with the given options.
    pub fn new(options: ProfileOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    /// Profiles every column of `view`.
    #[instrument(skip(self, view), fields(
        dataset.rows = view.row_count(),
        dataset.columns = view.column_count(),
        profile.correlations = self.options.compute_correlations
    ))]
    pub fn profile(&self, view: &DatasetView) -> Result<DatasetProfile> {
        let start_time = Instant::now();
        let names = view.column_names();
        let n_rows = view.row_count();
        let n_columns = names.len();

        let columns = names
            .par_iter()
            .map(|name| self.profile_column(view, name))
            .collect::<Result<Vec<_>>>()?;

        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        let mut other_columns = Vec::new();
        for column in &columns {
            let bucket = match column.kind {
                ColumnKind::Numeric => &mut numeric_columns,
                ColumnKind::Categorical => &mut categorical_columns,
                ColumnKind::Identifier | ColumnKind::Unknown => &mut other_columns,
            };
            bucket.push(column.name.clone());
        }

        let total_missing_cells: usize = columns.iter().map(|c| c.missing_count).sum();
        let cells = n_rows * n_columns;
        let complete_rows = complete_rows(view)?;

        let correlations = if self.options.compute_correlations && numeric_columns.len() >= 2 {
            Some(correlations(view, &numeric_columns)?)
        } else {
            None
        };

        let warnings = columns
            .iter()
            .flat_map(|column| self.warnings(column))
            .collect::<Vec<_>>();

        let profile = DatasetProfile {
            n_rows,
            n_columns,
            numeric_columns,
            categorical_columns,
            other_columns,
            total_missing_cells,
            missing_cell_pct: ratio(total_missing_cells, cells),
            complete_rows,
            complete_row_pct: ratio(complete_rows, n_rows),
            columns,
            correlations,
            warnings,
            created_at: chrono::Utc::now().to_rfc3339(),
            profiling_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            columns = profile.n_columns,
            warnings = profile.warnings.len(),
            time_ms = profile.profiling_time_ms,
            "Completed dataset profiling"
        );
        Ok(profile)
    }

    fn profile_column(&self, view: &DatasetView, name: &str) -> Result<ColumnProfile> {
        let kind = view.column_kind(name)?;
        let labels = view.values(name)?;
        let count = labels.len();
        let missing_count = labels.iter().filter(|v| v.is_none()).count();

        let mut frequencies: HashMap<Option<&str>, usize> = HashMap::new();
        for label in labels.iter() {
            *frequencies.entry(label.as_deref()).or_insert(0) += 1;
        }
        let unique_count = frequencies.len();

        let numeric = match kind {
            ColumnKind::Numeric => Some(stats::describe(&view.present_numeric(name)?)),
            _ => None,
        };

        let top_categories = match kind {
            ColumnKind::Categorical => {
                let mut ranked: Vec<(Option<&str>, usize)> = frequencies.into_iter().collect();
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                Some(
                    ranked
                        .into_iter()
                        .take(self.options.max_categories)
                        .map(|(value, n)| CategoryCount {
                            value: value.unwrap_or(MISSING_LABEL).to_string(),
                            count: n,
                            percentage: ratio(n, count) * 100.0,
                        })
                        .collect(),
                )
            }
            _ => None,
        };

        Ok(ColumnProfile {
            name: name.to_string(),
            kind,
            data_type: view.data_type(name)?.to_string(),
            count,
            missing_count,
            missing_pct: ratio(missing_count, count),
            unique_count,
            unique_pct: ratio(unique_count, count),
            is_constant: unique_count == 1,
            numeric,
            top_categories,
        })
    }

    fn warnings(&self, column: &ColumnProfile) -> Vec<ProfileWarning> {
        let warn = |kind, severity, message: String| ProfileWarning {
            column: column.name.clone(),
            kind,
            message,
            severity,
        };
        let mut warnings = Vec::new();

        if column.missing_pct > self.options.missing_warning_pct {
            warnings.push(warn(
                ProfileWarningKind::HighMissing,
                Severity::Warning,
                format!("Column has {:.1}% missing values", column.missing_pct * 100.0),
            ));
        }
        if column.kind == ColumnKind::Categorical && column.unique_pct > self.options.high_cardinality_pct {
            warnings.push(warn(
                ProfileWarningKind::HighCardinality,
                Severity::Info,
                "Column appears to be an identifier (nearly all values unique)".to_string(),
            ));
        }
        if column.is_constant {
            warnings.push(warn(
                ProfileWarningKind::Constant,
                Severity::Warning,
                "Column has a constant value".to_string(),
            ));
        }
        if let Some(summary) = &column.numeric {
            if let Some(skew) = summary.skewness.filter(|s| s.abs() > self.options.skewness_warning) {
                warnings.push(warn(
                    ProfileWarningKind::HighSkewness,
                    Severity::Info,
                    format!("Column has high skewness ({skew:.2})"),
                ));
            }
            if summary.std == Some(0.0) {
                warnings.push(warn(
                    ProfileWarningKind::ZeroVariance,
                    Severity::Error,
                    "Column has zero variance".to_string(),
                ));
            }
        }
        warnings
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn complete_rows(view: &DatasetView) -> Result<usize> {
    let columns = view
        .column_names()
        .into_iter()
        .map(|name| view.values(name))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..view.row_count())
        .filter(|row| columns.iter().all(|column| column[*row].is_some()))
        .count())
}

/// Pairwise-complete Pearson correlations; undefined pairs are left out.
fn correlations(view: &DatasetView, names: &[String]) -> Result<BTreeMap<String, BTreeMap<String, f64>>> {
    let columns = names
        .iter()
        .map(|name| view.numeric_values(name))
        .collect::<Result<Vec<_>>>()?;

    let mut matrix: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for (i, left) in columns.iter().enumerate() {
        for (j, right) in columns.iter().enumerate().skip(i) {
            let (xs, ys): (Vec<f64>, Vec<f64>) = left
                .iter()
                .zip(right.iter())
                .filter_map(|pair| match pair {
                    (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
                    _ => None,
                })
                .unzip();
            let Some(r) = stats::pearson(&xs, &ys) else {
                continue;
            };
            matrix.entry(names[i].clone()).or_default().insert(names[j].clone(), r);
            matrix.entry(names[j].clone()).or_default().insert(names[i].clone(), r);
        }
    }
    Ok(matrix)
}
