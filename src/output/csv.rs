//! CSV sink with a JSON table manifest

use super::types::{TableManifest, TabularSink};
use crate::error::{Error, Result};
use crate::normalize::column_names;
use crate::types::{scalar_to_string, JsonValue, Record};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination bucket used when none is configured
pub const DEFAULT_BUCKET: &str = "out.c-fidoo";

/// Writes `{table}.csv` and `{table}.csv.manifest`
#[derive(Debug, Clone)]
pub struct CsvSink {
    bucket: String,
}

impl Default for CsvSink {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET)
    }
}

impl CsvSink {
    /// Create a sink whose manifests point into `bucket`
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// Destination bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Manifest for table `name`
    pub fn manifest(
        &self,
        name: &str,
        key: Option<&[String]>,
        columns: Vec<String>,
    ) -> TableManifest {
        TableManifest {
            destination: format!("{}.{name}", self.bucket),
            incremental: false,
            primary_key: key.map(<[String]>::to_vec).unwrap_or_default(),
            columns,
        }
    }

    fn manifest_path(destination: &Path) -> PathBuf {
        let mut path = destination.as_os_str().to_owned();
        path.push(".manifest");
        PathBuf::from(path)
    }
}

impl TabularSink for CsvSink {
    fn write_table(
        &self,
        name: &str,
        destination: &Path,
        key: Option<&[String]>,
        records: &[Record],
    ) -> Result<usize> {
        let columns = column_names(records);

        let file = File::create(destination).map_err(|e| {
            Error::output(format!("Failed to create {}: {e}", destination.display()))
        })?;
        let mut out = BufWriter::new(file);

        write_row(&mut out, columns.iter().map(String::as_str))?;
        for record in records {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| record.get(c).map(cell).unwrap_or_default())
                .collect();
            write_row(&mut out, cells.iter().map(String::as_str))?;
        }
        out.flush()?;

        let manifest = self.manifest(name, key, columns);
        let manifest_file = File::create(Self::manifest_path(destination))?;
        serde_json::to_writer_pretty(BufWriter::new(manifest_file), &manifest)?;

        debug!(table = %name, rows = records.len(), path = %destination.display(), "Wrote CSV");
        Ok(records.len())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

fn cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
        scalar => scalar_to_string(scalar),
    }
}

fn write_row<'a>(out: &mut impl Write, cells: impl Iterator<Item = &'a str>) -> Result<()> {
    let line = cells.map(quote).collect::<Vec<_>>().join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

/// Quote a field when it contains a delimiter, quote or line break
pub(crate) fn quote(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
