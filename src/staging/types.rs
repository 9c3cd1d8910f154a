//! Staging store trait and column typing

use crate::error::Result;
use crate::types::{JsonValue, Record};

/// A minimal queryable table store
pub trait StagingStore: Send {
    /// Replace table `name` with `records`, returning the number of rows stored.
    ///
    /// An empty record set removes the table.
    fn create_or_replace(&mut self, name: &str, records: &[Record]) -> Result<usize>;

    /// Remove table `name` if it exists
    fn drop_table(&mut self, name: &str) -> Result<()>;

    /// Names of all staged tables, sorted
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Check if table `name` is staged
    fn has_table(&self, name: &str) -> Result<bool> {
        Ok(self.list_tables()?.iter().any(|t| t == name))
    }

    /// Number of rows in table `name`
    fn row_count(&self, name: &str) -> Result<usize>;

    /// Column names of table `name` in definition order
    fn columns(&self, name: &str) -> Result<Vec<String>>;

    /// Distinct non-null values of `field` in first-seen order
    fn distinct_values(&self, name: &str, field: &str) -> Result<Vec<JsonValue>>;

    /// All rows of table `name` in insertion order
    fn read_table(&self, name: &str) -> Result<Vec<Record>>;
}

/// Storage type chosen for a column from the values observed in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// All non-null values are booleans
    Boolean,
    /// All non-null values are integers that fit in i64
    BigInt,
    /// All non-null values are numbers
    Double,
    /// Anything else, including columns with only nulls
    Varchar,
}

impl ColumnType {
    /// SQL type name
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Infer the type of a column from its values
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a JsonValue>) -> Self {
        let mut inferred: Option<ColumnType> = None;
        for value in values {
            let current = match value {
                JsonValue::Null => continue,
                JsonValue::Bool(_) => ColumnType::Boolean,
                JsonValue::Number(n) if n.is_i64() => ColumnType::BigInt,
                JsonValue::Number(_) => ColumnType::Double,
                _ => return ColumnType::Varchar,
            };
            inferred = Some(match (inferred, current) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::BigInt | ColumnType::Double), ColumnType::BigInt | ColumnType::Double) => {
                    ColumnType::Double
                }
                _ => return ColumnType::Varchar,
            });
        }
        inferred.unwrap_or(ColumnType::Varchar)
    }
}
