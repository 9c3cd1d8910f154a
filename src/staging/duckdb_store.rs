//! DuckDB-backed staging store

use super::types::{ColumnType, StagingStore};
use crate::error::{Error, Result};
use crate::normalize::column_names;
use crate::types::{JsonValue, Record};
use duckdb::types::Value as DuckValue;
use duckdb::{appender_params_from_iter, params, Connection};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// Prefix of physical table names
const TABLE_PREFIX: &str = "t_";

/// Prefix of physical column names
const COLUMN_PREFIX: &str = "c_";

/// Staging store on an embedded DuckDB database.
///
/// DuckDB folds identifier case, while record field names are
/// case-sensitive and may hold any character. Table and column names are
/// therefore stored hex-encoded (`user` becomes `t_75736572`) and decoded
/// again on the way out, so `tags` and `Tags` stay distinct.
pub struct DuckDbStore {
    conn: Connection,
    location: String,
}

impl DuckDbStore {
    /// Open a transient in-memory store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::staging(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Open (or create) a persistent store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::staging(format!("Failed to open DuckDB at {}: {e}", path.display()))
        })?;
        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Where the store lives (`:memory:` or a file path)
    pub fn location(&self) -> &str {
        &self.location
    }

    fn ensure_table_exists(&self, name: &str) -> Result<()> {
        if self.has_table(name)? {
            Ok(())
        } else {
            Err(Error::staging(format!("Table '{name}' is not staged")))
        }
    }

    fn ensure_column_exists(&self, name: &str, field: &str) -> Result<()> {
        if self.columns(name)?.iter().any(|c| c == field) {
            Ok(())
        } else {
            Err(Error::staging(format!(
                "Table '{name}' has no column '{field}'"
            )))
        }
    }

    fn physical_names(&self, sql: &str, param: Option<&str>) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names = match param {
            Some(p) => stmt
                .query_map(params![p], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(names)
    }
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl StagingStore for DuckDbStore {
    fn create_or_replace(&mut self, name: &str, records: &[Record]) -> Result<usize> {
        self.drop_table(name)?;
        if records.is_empty() {
            return Ok(0);
        }

        let table = encode_ident(TABLE_PREFIX, name);
        let columns = column_names(records);
        let types: Vec<ColumnType> = columns
            .iter()
            .map(|c| ColumnType::infer(records.iter().filter_map(|r| r.get(c))))
            .collect();

        let definition = columns
            .iter()
            .zip(&types)
            .map(|(c, t)| {
                let column = encode_ident(COLUMN_PREFIX, c);
                format!("{} {}", quote_ident(&column), t.sql())
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.conn
            .execute_batch(&format!("CREATE TABLE {} ({definition});", quote_ident(&table)))
            .map_err(|e| Error::staging(format!("Failed to create table '{name}': {e}")))?;

        let mut appender = self.conn.appender(&table)?;
        for record in records {
            let row = columns
                .iter()
                .zip(&types)
                .map(|(c, t)| to_duck_value(record.get(c).unwrap_or(&JsonValue::Null), *t));
            appender.append_row(appender_params_from_iter(row))?;
        }
        appender.flush()?;

        debug!(table = name, rows = records.len(), columns = columns.len(), "Staged table");
        Ok(records.len())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        let table = encode_ident(TABLE_PREFIX, name);
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(&table)))
            .map_err(|e| Error::staging(format!("Failed to drop table '{name}': {e}")))
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let physical = self.physical_names(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main'",
            None,
        )?;
        let mut names: Vec<String> = physical
            .iter()
            .filter_map(|t| decode_ident(TABLE_PREFIX, t))
            .collect();
        names.sort();
        Ok(names)
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_name = ?",
            params![encode_ident(TABLE_PREFIX, name)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        self.ensure_table_exists(name)?;
        let table = encode_ident(TABLE_PREFIX, name);
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(&table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::staging(format!("Failed to count rows of '{name}': {e}")))?;
        Ok(count as usize)
    }

    fn columns(&self, name: &str) -> Result<Vec<String>> {
        let physical = self.physical_names(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
            Some(&encode_ident(TABLE_PREFIX, name)),
        )?;
        Ok(physical
            .iter()
            .filter_map(|c| decode_ident(COLUMN_PREFIX, c))
            .collect())
    }

    fn distinct_values(&self, name: &str, field: &str) -> Result<Vec<JsonValue>> {
        self.ensure_table_exists(name)?;
        self.ensure_column_exists(name, field)?;

        let column = quote_ident(&encode_ident(COLUMN_PREFIX, field));
        let sql = format!(
            "SELECT {column} FROM {table} WHERE {column} IS NOT NULL \
             GROUP BY {column} ORDER BY MIN(rowid)",
            table = quote_ident(&encode_ident(TABLE_PREFIX, name))
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, DuckValue>(0))?
            .map(|v| v.map(duckdb_value_to_json))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn read_table(&self, name: &str) -> Result<Vec<Record>> {
        let columns = self.columns(name)?;
        if columns.is_empty() {
            return Err(Error::staging(format!("Table '{name}' is not staged")));
        }

        let select = columns
            .iter()
            .map(|c| quote_ident(&encode_ident(COLUMN_PREFIX, c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select} FROM {} ORDER BY rowid",
            quote_ident(&encode_ident(TABLE_PREFIX, name))
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::new();
                for (i, column) in columns.iter().enumerate() {
                    let value: DuckValue = row.get(i)?;
                    record.insert(column.clone(), duckdb_value_to_json(value));
                }
                Ok(record)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Case-proof identifier: `prefix` followed by the lowercase hex of `name`
fn encode_ident(prefix: &str, name: &str) -> String {
    let mut ident = String::with_capacity(prefix.len() + name.len() * 2);
    ident.push_str(prefix);
    for byte in name.bytes() {
        let _ = write!(ident, "{byte:02x}");
    }
    ident
}

/// Inverse of [`encode_ident`]; `None` for identifiers this store did not create
fn decode_ident(prefix: &str, ident: &str) -> Option<String> {
    let hex = ident.strip_prefix(prefix)?;
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_duck_value(value: &JsonValue, column_type: ColumnType) -> DuckValue {
    match (value, column_type) {
        (JsonValue::Null, _) => DuckValue::Null,
        (JsonValue::Bool(b), ColumnType::Boolean) => DuckValue::Boolean(*b),
        (JsonValue::Number(n), ColumnType::BigInt) => {
            n.as_i64().map_or(DuckValue::Null, DuckValue::BigInt)
        }
        (JsonValue::Number(n), ColumnType::Double) => {
            n.as_f64().map_or(DuckValue::Null, DuckValue::Double)
        }
        (JsonValue::String(s), _) => DuckValue::Text(s.clone()),
        (other, _) => DuckValue::Text(other.to_string()),
    }
}

/// Convert DuckDB Value to JSON Value
fn duckdb_value_to_json(value: DuckValue) -> JsonValue {
    match value {
        DuckValue::Null => JsonValue::Null,
        DuckValue::Boolean(b) => JsonValue::Bool(b),
        DuckValue::TinyInt(i) => JsonValue::Number(i.into()),
        DuckValue::SmallInt(i) => JsonValue::Number(i.into()),
        DuckValue::Int(i) => JsonValue::Number(i.into()),
        DuckValue::BigInt(i) => JsonValue::Number(i.into()),
        DuckValue::HugeInt(i) => JsonValue::String(i.to_string()),
        DuckValue::UTinyInt(i) => JsonValue::Number(i.into()),
        DuckValue::USmallInt(i) => JsonValue::Number(i.into()),
        DuckValue::UInt(i) => JsonValue::Number(i.into()),
        DuckValue::UBigInt(i) => JsonValue::Number(i.into()),
        DuckValue::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(JsonValue::Null, JsonValue::Number)
        }
        DuckValue::Double(f) => {
            serde_json::Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
        }
        DuckValue::Text(s) => JsonValue::String(s),
        DuckValue::Blob(b) => JsonValue::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
        DuckValue::Timestamp(_, i) => {
            let secs = i / 1_000_000;
            let nsecs = ((i % 1_000_000) * 1000) as u32;
            chrono::DateTime::from_timestamp(secs, nsecs)
                .map(|dt| JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()))
                .unwrap_or(JsonValue::Number(i.into()))
        }
        DuckValue::Date32(d) => {
            // days since epoch; 719163 days from 1 CE to 1970-01-01
            chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
                .map(|date| JsonValue::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(JsonValue::Number(d.into()))
        }
        other => JsonValue::String(format!("{other:?}")),
    }
}
