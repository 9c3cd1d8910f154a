//! Tabular sink trait and table manifest

use super::csv::CsvSink;
use super::writer::ParquetSink;
use crate::error::Result;
use crate::types::{OutputFormat, Record};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persists one named table of flat records
pub trait TabularSink: Send + Sync {
    /// Write `records` to `destination`, overwriting prior content.
    ///
    /// `key` lists the key columns, `None` when the table has no key.
    /// Returns the number of rows written.
    fn write_table(
        &self,
        name: &str,
        destination: &Path,
        key: Option<&[String]>,
        records: &[Record],
    ) -> Result<usize>;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Path of table `name` under `output_dir`
    fn destination_for(&self, output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{name}.{}", self.extension()))
    }
}

/// Build the sink for `format`
pub fn sink_for(format: OutputFormat, bucket: &str) -> Box<dyn TabularSink> {
    match format {
        OutputFormat::Csv => Box::new(CsvSink::new(bucket)),
        OutputFormat::Parquet => Box::new(ParquetSink::default()),
    }
}

/// Sidecar describing a CSV table to the warehouse loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    /// `{bucket}.{table}`
    pub destination: String,
    /// Always false: every run is a full reload
    pub incremental: bool,
    /// Key columns, empty when the table has no key
    pub primary_key: Vec<String>,
    /// Header columns in file order
    pub columns: Vec<String>,
}
