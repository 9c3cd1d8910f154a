//! Output module
//!
//! Persists staged tables as flat files for warehouse ingestion.
//!
//! # Overview
//!
//! This module provides:
//! - The [`TabularSink`] trait used by the export phase
//! - [`CsvSink`]: RFC 4180 CSV plus a JSON table manifest
//! - [`ParquetSink`]: Arrow conversion and Snappy-compressed Parquet

mod csv;
mod schema;
mod types;
mod writer;

pub use csv::{CsvSink, DEFAULT_BUCKET};
pub use schema::{infer_schema, json_to_arrow};
pub use types::{sink_for, TableManifest, TabularSink};
pub use writer::{write_batch_to_parquet, ParquetSink, ParquetWriter, ParquetWriterConfig};
