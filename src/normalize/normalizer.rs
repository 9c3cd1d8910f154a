//! Recursive record flattening

use super::keys::{infer_primary_key, satellite_name, TableKey, INDEX, PARENT_ID, VALUE};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use std::collections::HashMap;

/// Where a satellite table was split off from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteOrigin {
    /// Table the nested field belonged to
    pub parent: String,
    /// Nested field name
    pub field: String,
}

impl std::fmt::Display for SatelliteOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.parent, self.field)
    }
}

/// A named set of flat records
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Flat records; field sets may differ between rows
    pub records: Vec<Record>,
    /// Parent table and field for satellites, `None` for primary tables
    pub origin: Option<SatelliteOrigin>,
}

impl Table {
    /// Create a primary table
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
            origin: None,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of column names in first-seen order
    pub fn columns(&self) -> Vec<String> {
        column_names(&self.records)
    }
}

/// Output of [`normalize`]: the flat table plus every satellite, depth first
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The flattened input table
    pub table: Table,
    /// Key used to link satellite rows
    pub key: TableKey,
    /// Satellite tables in first-appearance order, children after their parent
    pub satellites: Vec<Table>,
}

impl Normalized {
    /// All tables, the primary one first
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        std::iter::once(&self.table).chain(self.satellites.iter())
    }

    /// Consume into all tables, the primary one first
    pub fn into_tables(self) -> Vec<Table> {
        let mut tables = Vec::with_capacity(self.satellites.len() + 1);
        tables.push(self.table);
        tables.extend(self.satellites);
        tables
    }

    /// Rows across all satellite tables
    pub fn satellite_rows(&self) -> usize {
        self.satellites.iter().map(Table::len).sum()
    }
}

/// Union of field names over `records` in first-seen order
pub fn column_names(records: &[Record]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Fields that stay in the flat table for every record, in first-seen order.
///
/// A field holding a non-empty object or array in any record is split off
/// into a satellite, so it can never serve as a key.
pub fn scalar_column_names(records: &[Record]) -> Vec<String> {
    let nested: std::collections::HashSet<&str> = records
        .iter()
        .flat_map(|record| record.iter())
        .filter(|(_, value)| match value {
            JsonValue::Object(map) => !map.is_empty(),
            JsonValue::Array(items) => !items.is_empty(),
            _ => false,
        })
        .map(|(field, _)| field.as_str())
        .collect();

    column_names(records)
        .into_iter()
        .filter(|column| !nested.contains(column.as_str()))
        .collect()
}

/// Flatten `records` of `table_name` into a forest of flat tables.
///
/// When `primary_key` is `None` the key is inferred from field names; if that
/// fails, satellite rows get a null `parent_id`. Empty nested values become
/// null in the flat record. The only error is two different nested fields
/// mapping onto the same satellite name.
pub fn normalize(
    table_name: &str,
    records: Vec<Record>,
    primary_key: Option<&str>,
) -> Result<Normalized> {
    let key = match primary_key {
        Some(field) => TableKey::explicit(field),
        None => {
            let columns = scalar_column_names(&records);
            let fields: Vec<&str> = columns.iter().map(String::as_str).collect();
            infer_primary_key(table_name, &fields)
        }
    };
    normalize_with_key(table_name, records, key, None)
}

fn normalize_with_key(
    table_name: &str,
    records: Vec<Record>,
    key: TableKey,
    origin: Option<SatelliteOrigin>,
) -> Result<Normalized> {
    let mut flat_records = Vec::with_capacity(records.len());
    let mut children = Children::default();

    for record in records {
        let parent_id = key
            .field()
            .and_then(|field| record.get(field))
            .filter(|value| is_scalar(value))
            .cloned()
            .unwrap_or(JsonValue::Null);

        let mut flat = Record::new();
        for (field, value) in record {
            match value {
                JsonValue::Object(map) if map.is_empty() => {
                    flat.insert(field, JsonValue::Null);
                }
                JsonValue::Array(items) if items.is_empty() => {
                    flat.insert(field, JsonValue::Null);
                }
                JsonValue::Object(map) => {
                    let row = satellite_row(&parent_id, None, JsonValue::Object(map));
                    children.push(table_name, field, vec![row]);
                }
                JsonValue::Array(items) => {
                    let rows = items
                        .into_iter()
                        .enumerate()
                        .map(|(idx, item)| satellite_row(&parent_id, Some(idx), item))
                        .collect();
                    children.push(table_name, field, rows);
                }
                scalar => {
                    flat.insert(field, scalar);
                }
            }
        }
        flat_records.push(flat);
    }

    let mut satellites = Vec::new();
    let mut names: HashMap<String, SatelliteOrigin> = HashMap::new();

    for (name, child_origin, rows) in children.into_parts() {
        let child = normalize_with_key(
            &name,
            rows,
            TableKey::explicit(PARENT_ID),
            Some(child_origin),
        )?;
        for table in child.into_tables() {
            if let Some(table_origin) = &table.origin {
                if let Some(first) = names.get(&table.name) {
                    if first != table_origin {
                        return Err(Error::SatelliteCollision {
                            table: table.name.clone(),
                            first: first.to_string(),
                            second: table_origin.to_string(),
                        });
                    }
                }
                names.insert(table.name.clone(), table_origin.clone());
            }
            satellites.push(table);
        }
    }

    Ok(Normalized {
        table: Table {
            name: table_name.to_string(),
            records: flat_records,
            origin,
        },
        key,
        satellites,
    })
}

/// Satellite tables being collected for one level, in first-appearance order
#[derive(Default)]
struct Children {
    order: Vec<(String, SatelliteOrigin, Vec<Record>)>,
    index: HashMap<String, usize>,
}

impl Children {
    fn push(&mut self, parent: &str, field: String, rows: Vec<Record>) {
        let name = satellite_name(parent, &field);
        match self.index.get(&name) {
            Some(&i) => self.order[i].2.extend(rows),
            None => {
                self.index.insert(name.clone(), self.order.len());
                let origin = SatelliteOrigin {
                    parent: parent.to_string(),
                    field,
                };
                self.order.push((name, origin, rows));
            }
        }
    }

    fn into_parts(self) -> Vec<(String, SatelliteOrigin, Vec<Record>)> {
        self.order
    }
}

// Linkage columns come first and win over same-named element fields.
fn satellite_row(parent_id: &JsonValue, idx: Option<usize>, element: JsonValue) -> Record {
    let mut row = Record::new();
    row.insert(PARENT_ID.to_string(), parent_id.clone());
    if let Some(idx) = idx {
        row.insert(INDEX.to_string(), JsonValue::from(idx));
    }

    match element {
        JsonValue::Object(fields) => {
            for (field, value) in fields {
                if !row.contains_key(&field) {
                    row.insert(field, value);
                }
            }
        }
        other => {
            row.insert(VALUE.to_string(), other);
        }
    }
    row
}

fn is_scalar(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Object(_) | JsonValue::Array(_))
}
