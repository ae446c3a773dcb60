//! Arrow schema inference and row/batch conversion
//!
//! Flattened rows only ever hold scalars (lists of scalars arrive as JSON
//! text), so the type lattice is small: Boolean, Int64, Float64, Utf8.
//! Mixed types fall back to Utf8; missing values are null.

use crate::error::{Error, Result};
use crate::types::Row;
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Infer an Arrow schema for the given column order from row values.
///
/// Columns keep the caller's order (the registry's first-seen order); every
/// field is nullable because absent columns read as null on load.
pub fn build_schema(columns: &[String], rows: &[Row]) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| {
            let mut column_type: Option<DataType> = None;
            for row in rows {
                if let Some(value) = row.get(name) {
                    let value_type = infer_type(value);
                    column_type = Some(match column_type {
                        None => value_type,
                        Some(existing) => merge_types(&existing, &value_type),
                    });
                }
            }
            Field::new(name, column_type.unwrap_or(DataType::Utf8), true)
        })
        .collect();

    Schema::new(fields)
}

/// Convert rows to an Arrow RecordBatch with the given column order
pub fn rows_to_batch(columns: &[String], rows: &[Row]) -> Result<RecordBatch> {
    let schema = build_schema(columns, rows);
    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(schema)));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for field in schema.fields() {
        let values: Vec<Option<&Value>> = rows.iter().map(|row| row.get(field.name())).collect();
        arrays.push(build_array(&values, field.data_type()));
    }

    RecordBatch::try_new(Arc::new(schema), arrays).map_err(|e| Error::Output {
        message: format!("Failed to create RecordBatch: {e}"),
    })
}

/// Convert a RecordBatch back to rows (used when merging incremental loads)
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let mut rows: Vec<Row> = vec![Row::new(); batch.num_rows()];

    for (column_idx, field) in batch.schema().fields().iter().enumerate() {
        let array = batch.column(column_idx);
        for (row_idx, row) in rows.iter_mut().enumerate() {
            if array.is_null(row_idx) {
                continue;
            }
            let value = array_value(array, field.data_type(), row_idx)?;
            row.insert(field.name().clone(), value);
        }
    }

    Ok(rows)
}

/// Infer Arrow DataType from a scalar JSON value
fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        _ => DataType::Utf8,
    }
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        // Different types -> fall back to String (most flexible)
        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from scalar JSON values
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Arc::new(arr)
        }
        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Arc::new(arr)
        }
        DataType::Float64 => {
            let arr: Float64Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_f64().or_else(|| v.as_i64().map(|i| i as f64))))
                .collect();
            Arc::new(arr)
        }
        _ => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Arc::new(arr)
        }
    }
}

/// Read one cell back into a JSON value
fn array_value(array: &ArrayRef, data_type: &DataType, row_idx: usize) -> Result<Value> {
    let value = match data_type {
        DataType::Boolean => {
            let arr = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| Error::output("Boolean column with mismatched array"))?;
            Value::Bool(arr.value(row_idx))
        }
        DataType::Int64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| Error::output("Int64 column with mismatched array"))?;
            Value::from(arr.value(row_idx))
        }
        DataType::Float64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| Error::output("Float64 column with mismatched array"))?;
            Value::from(arr.value(row_idx))
        }
        DataType::Utf8 => {
            let arr = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::output("Utf8 column with mismatched array"))?;
            Value::String(arr.value(row_idx).to_string())
        }
        other => {
            return Err(Error::output(format!(
                "Unsupported column type in existing output: {other}"
            )))
        }
    };
    Ok(value)
}
