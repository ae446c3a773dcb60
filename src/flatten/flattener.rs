//! The flattening algorithm

use super::types::{
    ColumnRole, FlattenWarning, FlattenedRecord, TableRows, CHILD_TABLE_SEP, FOREIGN_KEY_SUFFIX,
    INDEX_COLUMN, RECORD_ID_COLUMN, SUBOBJECT_SEP,
};
use crate::error::{Error, Result};
use crate::types::{JsonObject, Row};
use serde_json::Value;
use std::collections::HashMap;

/// Flatten one record into rows across one or more tables.
///
/// The main table is always present (one row per record, even for records
/// with no fields); child tables appear as lists of objects are encountered.
/// `allowlist`, when given, restricts which top-level fields are considered;
/// fields absent from the record are simply not produced.
///
/// The function is pure: the same record always yields the same tables,
/// rows and warnings, independent of any other record.
pub fn flatten_record(
    table: &str,
    record_id: &str,
    fields: &JsonObject,
    allowlist: Option<&[String]>,
) -> Result<FlattenedRecord> {
    let fk_column = format!("{table}{FOREIGN_KEY_SUFFIX}");
    let ctx = Ctx {
        record_id,
        fk_column: &fk_column,
    };
    let mut acc = Accumulator::new(table);

    let mut row = Row::new();
    write_key(
        &mut acc,
        0,
        &mut row,
        RECORD_ID_COLUMN,
        ColumnRole::RecordId,
        Value::String(record_id.to_string()),
    )?;

    for (field, value) in fields {
        if let Some(allow) = allowlist {
            if !allow.iter().any(|f| f == field) {
                continue;
            }
        }
        flatten_value(&mut acc, &ctx, 0, table, &mut row, field, value, None)?;
    }

    acc.out.tables[0].rows.push(row);
    Ok(acc.out)
}

/// Per-record context threaded through the recursion
struct Ctx<'a> {
    record_id: &'a str,
    fk_column: &'a str,
}

/// Collects tables in first-seen order while the recursion runs
struct Accumulator {
    out: FlattenedRecord,
    index: HashMap<String, usize>,
}

impl Accumulator {
    fn new(main_table: &str) -> Self {
        let mut acc = Self {
            out: FlattenedRecord::default(),
            index: HashMap::new(),
        };
        acc.ensure_table(main_table);
        acc
    }

    fn ensure_table(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.out.tables.push(TableRows::new(name));
        let i = self.out.tables.len() - 1;
        self.index.insert(name.to_string(), i);
        i
    }
}

/// Classify one value and place it: rules 1-5 from the module docs.
#[allow(clippy::too_many_arguments)]
fn flatten_value(
    acc: &mut Accumulator,
    ctx: &Ctx<'_>,
    table_idx: usize,
    table_name: &str,
    row: &mut Row,
    column: &str,
    value: &Value,
    ordinal_prefix: Option<&str>,
) -> Result<()> {
    match value {
        // Rule 5: absent columns read as null downstream.
        Value::Null => Ok(()),

        // Rule 1
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            write_data(acc, table_idx, row, column, value.clone())
        }

        // Rule 4: prefix keys and keep flattening into the same row.
        Value::Object(map) => {
            for (key, nested) in map {
                let nested_column = format!("{column}{SUBOBJECT_SEP}{key}");
                flatten_value(
                    acc,
                    ctx,
                    table_idx,
                    table_name,
                    row,
                    &nested_column,
                    nested,
                    ordinal_prefix,
                )?;
            }
            Ok(())
        }

        Value::Array(items) => {
            if items.iter().any(Value::is_object) {
                // Rule 3
                fan_out_child_rows(acc, ctx, table_name, column, items, ordinal_prefix)
            } else if items.iter().any(Value::is_array) {
                Err(Error::flatten(
                    ctx.record_id,
                    format!("field '{column}' is a list of lists, which has no relational shape"),
                ))
            } else {
                // Rule 2: the list stays on the main row as JSON text.
                let text = serde_json::to_string(value)?;
                write_data(acc, table_idx, row, column, Value::String(text))
            }
        }
    }
}

/// Rule 3: one child-table row per object in the list.
fn fan_out_child_rows(
    acc: &mut Accumulator,
    ctx: &Ctx<'_>,
    parent_table: &str,
    field: &str,
    items: &[Value],
    ordinal_prefix: Option<&str>,
) -> Result<()> {
    let child_table = format!("{parent_table}{CHILD_TABLE_SEP}{field}");
    let table_idx = acc.ensure_table(&child_table);

    let skipped = items.iter().filter(|v| !v.is_object()).count();
    if skipped > 0 {
        acc.out.warnings.push(FlattenWarning::MixedList {
            table: child_table.clone(),
            field: field.to_string(),
            skipped,
        });
    }

    for (position, item) in items.iter().enumerate() {
        let Value::Object(object) = item else {
            continue;
        };

        // Ordinals keep the original list position, so skipped scalar
        // entries never shift the identity of their object neighbors.
        let ordinal = match ordinal_prefix {
            None => position.to_string(),
            Some(prefix) => format!("{prefix}.{position}"),
        };

        let mut child_row = Row::new();
        for (key, value) in object {
            flatten_value(
                acc,
                ctx,
                table_idx,
                &child_table,
                &mut child_row,
                key,
                value,
                Some(&ordinal),
            )?;
        }

        // Key columns go last so object data cannot clobber them; a name
        // clash surfaces as a role conflict instead.
        write_key(
            acc,
            table_idx,
            &mut child_row,
            ctx.fk_column,
            ColumnRole::ForeignKey,
            Value::String(ctx.record_id.to_string()),
        )?;
        write_key(
            acc,
            table_idx,
            &mut child_row,
            INDEX_COLUMN,
            ColumnRole::Ordinal,
            Value::String(ordinal),
        )?;

        acc.out.tables[table_idx].rows.push(child_row);
    }

    Ok(())
}

/// Place a data value on a row, warning when a synthesized name collides
/// with a column already on the same row (last write wins).
fn write_data(
    acc: &mut Accumulator,
    table_idx: usize,
    row: &mut Row,
    column: &str,
    value: Value,
) -> Result<()> {
    let collided = {
        let table = &mut acc.out.tables[table_idx];
        table.note_column(column, ColumnRole::Data)?;
        row.insert(column.to_string(), value).is_some()
    };
    if collided {
        let table_name = acc.out.tables[table_idx].name.clone();
        acc.out.warnings.push(FlattenWarning::ColumnCollision {
            table: table_name,
            column: column.to_string(),
        });
    }
    Ok(())
}

/// Place a key column (record id, foreign key, ordinal) on a row.
fn write_key(
    acc: &mut Accumulator,
    table_idx: usize,
    row: &mut Row,
    column: &str,
    role: ColumnRole,
    value: Value,
) -> Result<()> {
    let table = &mut acc.out.tables[table_idx];
    table.note_column(column, role)?;
    row.insert(column.to_string(), value);
    Ok(())
}
