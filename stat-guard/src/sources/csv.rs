//! CSV file source built on the Arrow CSV reader.

use super::DataSource;
use crate::core::{ColumnKind, DatasetView};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Escape character (default: None)
    pub escape: Option<u8>,
    /// Comment prefix (lines starting with this are ignored)
    pub comment: Option<u8>,
    /// Schema to use (if None, will be inferred)
    pub schema: Option<SchemaRef>,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
    /// Rows per Arrow batch while reading
    pub batch_size: usize,
    /// Cell values read as null in addition to empty cells
    pub null_values: Vec<String>,
    /// Columns to treat as identifiers rather than numbers or categories
    pub identifier_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            schema: None,
            schema_infer_max_records: 1000,
            batch_size: 8192,
            null_values: vec!["NA".to_string(), "N/A".to_string(), "null".to_string()],
            identifier_columns: Vec::new(),
        }
    }
}

impl CsvOptions {
    /// Tab-separated input.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    /// Matches empty cells and the configured null markers.
    fn null_regex(&self) -> Result<Regex> {
        let alternatives: Vec<String> = self.null_values.iter().map(|v| regex::escape(v)).collect();
        let pattern = if alternatives.is_empty() {
            "^$".to_string()
        } else {
            format!("^(?:{})?$", alternatives.join("|"))
        };
        Regex::new(&pattern)
            .map_err(|e| StatGuardError::Configuration(format!("Invalid null marker pattern: {e}")))
    }

    fn format(&self, null_regex: Regex) -> Format {
        let mut format = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .with_quote(self.quote)
            .with_null_regex(null_regex);
        if let Some(escape) = self.escape {
            format = format.with_escape(escape);
        }
        if let Some(comment) = self.comment {
            format = format.with_comment(comment);
        }
        format
    }
}

/// A CSV file loaded fully into memory.
///
/// # Examples
///
/// ```rust,no_run
/// use stat_guard::sources::{CsvOptions, CsvSource, DataSource};
///
/// let options = CsvOptions {
///     identifier_columns: vec!["user_id".to_string()],
///     ..CsvOptions::default()
/// };
/// let view = CsvSource::with_options("data/experiment.tsv", CsvOptions { delimiter: b'\t', ..options })
///     .load()
///     .unwrap();
/// # let _ = view;
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
    logging: LogConfig,
}

impl CsvSource {
    /// Creates a CSV source with default options.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    /// Creates a CSV source with custom options.
    pub fn with_options(path: impl AsRef<Path>, options: CsvOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
            logging: LogConfig::default(),
        }
    }

    /// Sets how loading is logged.
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the reading options.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Infers the schema from the first records unless one was supplied.
    fn schema(&self, reader: &mut BufReader<File>, null_regex: Regex) -> Result<SchemaRef> {
        if let Some(schema) = &self.options.schema {
            return Ok(schema.clone());
        }
        let (schema, records) = self
            .options
            .format(null_regex)
            .infer_schema(&mut *reader, Some(self.options.schema_infer_max_records))?;
        debug!(records, fields = schema.fields().len(), "Inferred CSV schema");
        reader.seek(SeekFrom::Start(0))?;
        Ok(Arc::new(schema))
    }
}

impl DataSource for CsvSource {
    #[instrument(skip(self), fields(source.path = %self.path.display()))]
    fn load(&self) -> Result<DatasetView> {
        let start = Instant::now();
        let file = File::open(&self.path).with_context(|| {
            format!("Failed to open CSV file '{}'", self.path.display())
        })?;
        let mut reader = BufReader::new(file);

        let null_regex = self.options.null_regex()?;
        let schema = self.schema(&mut reader, null_regex.clone())?;

        let batches = ReaderBuilder::new(schema.clone())
            .with_format(self.options.format(null_regex))
            .with_batch_size(self.options.batch_size)
            .build(reader)?
            .collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;

        let mut view = DatasetView::new(batch);
        for column in &self.options.identifier_columns {
            view = view.with_kind(column, ColumnKind::Identifier)?;
        }

        log_data_op!(
            self.logging,
            source.path = %truncate_field(&self.path.display().to_string(), self.logging.max_field_length),
            dataset.rows = view.row_count(),
            dataset.columns = view.column_count(),
            load_time_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV file"
        );
        Ok(view)
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}
