//! Read-only view over tabular data.
//!
//! [`DatasetView`] wraps an Arrow [`RecordBatch`] and exposes the typed access
//! checks need: numeric values, display labels, per-column kinds and the row
//! count. Converted columns are memoised on first access, so many checks (or
//! many worker threads) can share one view without repeating casts.

use crate::prelude::*;
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Separator used when building row signatures; it never appears in CSV text.
const FIELD_SEPARATOR: char = '\u{1f}';
const NULL_MARKER: &str = "\u{0}";

/// How checks should treat a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Integer, floating point or decimal values
    Numeric,
    /// Text, boolean or dictionary-encoded labels
    Categorical,
    /// Unit or row identifiers, declared explicitly
    Identifier,
    /// Anything else (temporal, nested, null-typed)
    Unknown,
}

impl ColumnKind {
    /// Classifies an Arrow data type.
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            dt if dt.is_numeric() => ColumnKind::Numeric,
            DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Utf8View
            | DataType::Boolean
            | DataType::Dictionary(_, _) => ColumnKind::Categorical,
            _ => ColumnKind::Unknown,
        }
    }

    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Identifier => "identifier",
            ColumnKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only view over a rectangular table.
///
/// Column kinds are fixed once the view is handed to the engine; the only way
/// to change one is [`DatasetView::with_kind`], which consumes the view.
///
/// # Examples
///
/// ```rust
/// use arrow::array::{ArrayRef, Float64Array, StringArray};
/// use stat_guard::core::{ColumnKind, DatasetView};
/// use std::sync::Arc;
///
/// let view = DatasetView::try_from_columns(vec![
///     ("revenue", Arc::new(Float64Array::from(vec![1.0, 2.5, 4.0])) as ArrayRef),
///     ("arm", Arc::new(StringArray::from(vec!["a", "b", "a"])) as ArrayRef),
/// ])
/// .unwrap();
///
/// assert_eq!(view.row_count(), 3);
/// assert_eq!(view.column_kind("revenue").unwrap(), ColumnKind::Numeric);
/// assert_eq!(view.column_kind("arm").unwrap(), ColumnKind::Categorical);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetView {
    batch: RecordBatch,
    kinds: Vec<ColumnKind>,
    numeric: Vec<OnceCell<Arc<[Option<f64>]>>>,
    labels: Vec<OnceCell<Arc<[Option<String>]>>>,
}

impl DatasetView {
    /// Wraps a record batch, inferring column kinds from the Arrow schema.
    pub fn new(batch: RecordBatch) -> Self {
        let kinds: Vec<ColumnKind> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| ColumnKind::from_data_type(field.data_type()))
            .collect();
        let width = kinds.len();
        Self {
            batch,
            kinds,
            numeric: (0..width).map(|_| OnceCell::new()).collect(),
            labels: (0..width).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Builds a view from named Arrow arrays of equal length.
    pub fn try_from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: AsRef<str>,
    {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self::new(batch))
    }

    /// Declares the kind of a column, typically [`ColumnKind::Identifier`].
    pub fn with_kind(mut self, name: &str, kind: ColumnKind) -> Result<Self> {
        let index = self.index_of(name)?;
        self.kinds[index] = kind;
        Ok(self)
    }

    /// Returns the underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    /// Returns the column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Returns true if the dataset has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_ok()
    }

    /// Returns the kind of a column.
    pub fn column_kind(&self, name: &str) -> Result<ColumnKind> {
        Ok(self.kinds[self.index_of(name)?])
    }

    /// Returns the names of all columns of the given kind, in schema order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.column_names()
            .into_iter()
            .zip(self.kinds.iter())
            .filter(|(_, k)| **k == kind)
            .map(|(name, _)| name)
            .collect()
    }

    /// Returns the Arrow data type of a column.
    pub fn data_type(&self, name: &str) -> Result<&DataType> {
        let index = self.index_of(name)?;
        Ok(self.batch.schema_ref().field(index).data_type())
    }

    /// Returns the raw Arrow array of a column.
    pub fn array(&self, name: &str) -> Result<&ArrayRef> {
        let index = self.index_of(name)?;
        Ok(self.batch.column(index))
    }

    /// Returns the column as optional `f64` values in row order.
    ///
    /// Text that does not parse as a number becomes `None`.
    pub fn numeric_values(&self, name: &str) -> Result<Arc<[Option<f64>]>> {
        let index = self.index_of(name)?;
        self.numeric[index]
            .get_or_try_init(|| {
                let casted = cast(self.batch.column(index), &DataType::Float64)?;
                let floats = casted
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        StatGuardError::Internal(format!("column '{name}' did not cast to Float64"))
                    })?;
                Ok(floats.iter().collect::<Vec<_>>().into())
            })
            .cloned()
    }

    /// Returns the column as optional display strings in row order.
    pub fn values(&self, name: &str) -> Result<Arc<[Option<String>]>> {
        let index = self.index_of(name)?;
        self.labels[index]
            .get_or_try_init(|| {
                let casted = cast(self.batch.column(index), &DataType::Utf8)?;
                let strings = casted
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        StatGuardError::Internal(format!("column '{name}' did not cast to Utf8"))
                    })?;
                Ok(strings
                    .iter()
                    .map(|value| value.map(str::to_string))
                    .collect::<Vec<_>>()
                    .into())
            })
            .cloned()
    }

    /// Returns the non-null, finite numeric values of a column.
    pub fn present_numeric(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self
            .numeric_values(name)?
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect())
    }

    /// Returns the number of null cells in a column.
    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.values(name)?.iter().filter(|v| v.is_none()).count())
    }

    /// Returns one canonical string per row covering every column.
    pub fn row_signatures(&self) -> Result<Vec<String>> {
        let columns = self
            .column_names()
            .into_iter()
            .map(|name| self.values(name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.row_count())
            .map(|row| {
                let mut signature = String::new();
                for column in &columns {
                    signature.push_str(column[row].as_deref().unwrap_or(NULL_MARKER));
                    signature.push(FIELD_SEPARATOR);
                }
                signature
            })
            .collect())
    }

    /// Returns the row count per distinct non-null label of `group`.
    pub fn group_sizes(&self, group: &str) -> Result<BTreeMap<String, usize>> {
        let mut sizes = BTreeMap::new();
        for label in self.values(group)?.iter().flatten() {
            *sizes.entry(label.clone()).or_insert(0) += 1;
        }
        Ok(sizes)
    }

    /// Splits the finite values of `column` by the labels of `group`.
    ///
    /// Rows with a null group label or a missing value are dropped. Groups are
    /// ordered by label.
    pub fn grouped_numeric(&self, column: &str, group: &str) -> Result<BTreeMap<String, Vec<f64>>> {
        let values = self.numeric_values(column)?;
        let labels = self.values(group)?;
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (value, label) in values.iter().zip(labels.iter()) {
            if let Some(label) = label {
                let bucket = groups.entry(label.clone()).or_default();
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    bucket.push(v);
                }
            }
        }
        Ok(groups)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.batch
            .schema_ref()
            .index_of(name)
            .map_err(|_| StatGuardError::column_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Int64Array};

    fn sample_view() -> DatasetView {
        DatasetView::try_from_columns(vec![
            (
                "score",
                Arc::new(Float64Array::from(vec![Some(1.0), None, Some(3.5), Some(3.5)])) as ArrayRef,
            ),
            (
                "arm",
                Arc::new(StringArray::from(vec![Some("b"), Some("a"), None, Some("a")])) as ArrayRef,
            ),
            (
                "user_id",
                Arc::new(Int64Array::from(vec![10, 11, 12, 13])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_kind_inference() {
        let view = sample_view();
        assert_eq!(view.column_kind("score").unwrap(), ColumnKind::Numeric);
        assert_eq!(view.column_kind("arm").unwrap(), ColumnKind::Categorical);
        assert_eq!(view.column_kind("user_id").unwrap(), ColumnKind::Numeric);
        assert_eq!(
            ColumnKind::from_data_type(&DataType::Boolean),
            ColumnKind::Categorical
        );
        assert_eq!(
            ColumnKind::from_data_type(&DataType::Date32),
            ColumnKind::Unknown
        );
    }

    #[test]
    fn test_declared_identifier() {
        let view = sample_view()
            .with_kind("user_id", ColumnKind::Identifier)
            .unwrap();
        assert_eq!(view.column_kind("user_id").unwrap(), ColumnKind::Identifier);
        assert_eq!(view.columns_of_kind(ColumnKind::Numeric), vec!["score"]);
    }

    #[test]
    fn test_missing_column() {
        let view = sample_view();
        let err = view.numeric_values("revenue").unwrap_err();
        assert!(matches!(err, StatGuardError::ColumnNotFound { column } if column == "revenue"));
        assert!(view.with_kind("revenue", ColumnKind::Identifier).is_err());
    }

    #[test]
    fn test_numeric_and_label_access() {
        let view = sample_view();
        assert_eq!(
            view.numeric_values("score").unwrap().as_ref(),
            &[Some(1.0), None, Some(3.5), Some(3.5)]
        );
        assert_eq!(view.present_numeric("score").unwrap(), vec![1.0, 3.5, 3.5]);
        assert_eq!(view.null_count("arm").unwrap(), 1);
        assert_eq!(view.values("arm").unwrap()[0].as_deref(), Some("b"));
        // Text that is not numeric becomes null rather than failing.
        assert_eq!(view.numeric_values("arm").unwrap()[0], None);
    }

    #[test]
    fn test_grouping_is_ordered_by_label() {
        let view = sample_view();
        let sizes = view.group_sizes("arm").unwrap();
        assert_eq!(sizes.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(sizes["a"], 2);

        let groups = view.grouped_numeric("score", "arm").unwrap();
        assert_eq!(groups["a"], vec![3.5]);
        assert_eq!(groups["b"], vec![1.0]);
    }

    #[test]
    fn test_row_signatures_detect_duplicates() {
        let view = DatasetView::try_from_columns(vec![
            ("x", Arc::new(Int64Array::from(vec![1, 1, 2])) as ArrayRef),
            (
                "flag",
                Arc::new(BooleanArray::from(vec![true, true, true])) as ArrayRef,
            ),
        ])
        .unwrap();
        let signatures = view.row_signatures().unwrap();
        assert_eq!(signatures[0], signatures[1]);
        assert_ne!(signatures[0], signatures[2]);
    }
}
