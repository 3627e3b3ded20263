//! Data sources that produce a [`DatasetView`].
//!
//! Validation itself works on in-memory Arrow data; sources only load it.
//! CSV is the one file format the command-line tool reads.

use crate::core::DatasetView;
use crate::prelude::*;
use std::fmt::Debug;

mod csv;

pub use csv::{CsvOptions, CsvSource};

/// Something that can be materialized into a dataset view.
///
/// # Examples
///
/// ```rust,no_run
/// use stat_guard::sources::{CsvSource, DataSource};
///
/// let view = CsvSource::new("data/experiment.csv").load().unwrap();
/// println!("{} rows", view.row_count());
/// ```
pub trait DataSource: Debug + Send + Sync {
    /// Reads the whole source into memory.
    fn load(&self) -> Result<DatasetView>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}
