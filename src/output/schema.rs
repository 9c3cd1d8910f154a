//! Arrow schema inference and record to Arrow conversion
//!
//! Staged tables are flat, so every column maps to a primitive Arrow type.
//! Column order follows first appearance across the records.

use crate::error::{Error, Result};
use crate::normalize::column_names;
use crate::types::{JsonValue, Record};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Infer an Arrow schema from flat records
///
/// Every field is nullable. A column that only ever holds nulls is typed
/// as `Utf8` so the file stays readable by warehouse loaders.
pub fn infer_schema(records: &[Record]) -> Schema {
    let fields: Vec<Field> = column_names(records)
        .into_iter()
        .map(|name| {
            let dtype = records
                .iter()
                .filter_map(|r| r.get(&name))
                .map(infer_type)
                .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
            let dtype = if dtype == DataType::Null {
                DataType::Utf8
            } else {
                dtype
            };
            Field::new(name, dtype, true)
        })
        .collect();

    Schema::new(fields)
}

/// Convert flat records to an Arrow RecordBatch
pub fn json_to_arrow(records: &[Record]) -> Result<RecordBatch> {
    let schema = Arc::new(infer_schema(records));

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let values: Vec<Option<&JsonValue>> = records
                .iter()
                .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
                .collect();
            build_array(&values, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &JsonValue) -> DataType {
    match value {
        JsonValue::Null => DataType::Null,
        JsonValue::Bool(_) => DataType::Boolean,
        JsonValue::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        // Nested values never reach a staged table; keep them as JSON text if they do.
        JsonValue::String(_) | JsonValue::Array(_) | JsonValue::Object(_) => DataType::Utf8,
    }
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from JSON values (None and null are the same)
fn build_array(values: &[Option<&JsonValue>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values
                .iter()
                .map(|v| v.and_then(JsonValue::as_bool))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(JsonValue::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            #[allow(clippy::cast_precision_loss)]
            let arr: Float64Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_f64().or_else(|| v.as_i64().map(|i| i as f64))))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        other => Err(Error::output(format!(
            "Unsupported column type for flat table: {other}"
        ))),
    }
}
