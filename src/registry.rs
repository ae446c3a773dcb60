//! Additive per-table schema accumulation
//!
//! The registry tracks, for the main table and each discovered child table,
//! the union of all column names ever observed, in first-seen order. Columns
//! are only ever added, never removed; later records extend a table's column
//! set but cannot shrink or reorder it. The writer uses the accumulated
//! schemas to declare and extend destination tables.
//!
//! A registry instance is owned by one run and passed by reference through
//! it, so multiple configuration rows can run independently.

use crate::error::{Error, Result};
use crate::flatten::{Column, ColumnRole, TableRows};
use std::collections::HashMap;

/// Accumulated schema for one output table
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Output table name
    pub name: String,
    /// Columns in first-seen order; grows, never shrinks
    pub columns: Vec<Column>,
    roles: HashMap<String, ColumnRole>,
}

impl TableSchema {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            roles: HashMap::new(),
        }
    }

    /// Column names in first-seen order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The table's primary key, derived from column roles: `record_id` for
    /// the main table, `(foreign key, ordinal)` for child tables.
    pub fn primary_key(&self) -> Vec<&str> {
        let record_id: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.role == ColumnRole::RecordId)
            .map(|c| c.name.as_str())
            .collect();
        if !record_id.is_empty() {
            return record_id;
        }

        let mut key: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.role == ColumnRole::ForeignKey)
            .map(|c| c.name.as_str())
            .collect();
        key.extend(
            self.columns
                .iter()
                .filter(|c| c.role == ColumnRole::Ordinal)
                .map(|c| c.name.as_str()),
        );
        key
    }

    /// Merge one record's column sightings into the accumulated set.
    fn merge(&mut self, columns: &[Column]) -> Result<()> {
        for column in columns {
            match self.roles.get(&column.name).copied() {
                None => {
                    self.roles.insert(column.name.clone(), column.role);
                    self.columns.push(column.clone());
                }
                Some(existing) if existing == column.role => {}
                Some(existing) => {
                    return Err(Error::schema_conflict(
                        &self.name,
                        &column.name,
                        format!(
                            "used as both a {} and a {}",
                            existing.describe(),
                            column.role.describe()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Registry of every output table discovered during a run
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: Vec<TableSchema>,
    index: HashMap<String, usize>,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record's output for one table into the registry and return
    /// the table's effective column set.
    ///
    /// Fails with a schema conflict when a column name arrives with a role
    /// incompatible with an earlier sighting; that means the output shape is
    /// ambiguous and must not be silently resolved.
    pub fn register(&mut self, fragment: &TableRows) -> Result<&TableSchema> {
        let idx = match self.index.get(&fragment.name).copied() {
            Some(i) => i,
            None => {
                self.tables.push(TableSchema::new(&fragment.name));
                let i = self.tables.len() - 1;
                self.index.insert(fragment.name.clone(), i);
                i
            }
        };
        self.tables[idx].merge(&fragment.columns)?;
        Ok(&self.tables[idx])
    }

    /// Look up one table's accumulated schema
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    /// All tables in first-seen order
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    /// Number of tables discovered so far
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table has been registered yet
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_record;
    use crate::types::JsonObject;
    use serde_json::{json, Value};

    fn fields(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn register_all(registry: &mut TableRegistry, record_id: &str, value: Value) {
        let out = flatten_record("orders", record_id, &fields(value), None).unwrap();
        for table in &out.tables {
            registry.register(table).unwrap();
        }
    }

    #[test]
    fn test_columns_accumulate_across_records() {
        let mut registry = TableRegistry::new();
        register_all(&mut registry, "rec1", json!({"Name": "a"}));
        register_all(&mut registry, "rec2", json!({"Name": "b", "Qty": 2}));
        register_all(&mut registry, "rec3", json!({"Qty": 3}));

        let main = registry.get("orders").unwrap();
        assert_eq!(main.column_names(), vec!["record_id", "Name", "Qty"]);
    }

    #[test]
    fn test_column_set_never_shrinks() {
        let mut registry = TableRegistry::new();
        register_all(&mut registry, "rec1", json!({"Name": "a", "Qty": 1}));
        let before = registry.get("orders").unwrap().column_names().len();

        // A record missing both fields cannot remove them.
        register_all(&mut registry, "rec2", json!({}));
        assert_eq!(registry.get("orders").unwrap().column_names().len(), before);
    }

    #[test]
    fn test_union_is_order_preserving() {
        let mut registry = TableRegistry::new();
        register_all(&mut registry, "rec1", json!({"B": 1}));
        register_all(&mut registry, "rec2", json!({"A": 1}));

        // First-seen order, not alphabetical across records.
        let main = registry.get("orders").unwrap();
        assert_eq!(main.column_names(), vec!["record_id", "B", "A"]);
    }

    #[test]
    fn test_child_tables_register_independently() {
        let mut registry = TableRegistry::new();
        register_all(&mut registry, "rec1", json!({"Items": [{"x": 1}]}));
        register_all(&mut registry, "rec2", json!({"Items": [{"y": 2}]}));

        assert_eq!(registry.len(), 2);
        let child = registry.get("orders__Items").unwrap();
        assert_eq!(
            child.column_names(),
            vec!["x", "orders_record_id", "_index", "y"]
        );
    }

    #[test]
    fn test_primary_keys() {
        let mut registry = TableRegistry::new();
        register_all(&mut registry, "rec1", json!({"Items": [{"x": 1}]}));

        assert_eq!(
            registry.get("orders").unwrap().primary_key(),
            vec!["record_id"]
        );
        assert_eq!(
            registry.get("orders__Items").unwrap().primary_key(),
            vec!["orders_record_id", "_index"]
        );
    }

    #[test]
    fn test_role_conflict_across_records_fails() {
        let mut registry = TableRegistry::new();
        // rec1 introduces "orders_record_id" as a plain data column on the
        // main table; a later child table in the same table name space is
        // fine, but reusing the name with another role in the same table
        // is not.
        register_all(&mut registry, "rec1", json!({"Items": [{"x": 1}]}));

        let clashing = flatten_record(
            "orders__Items",
            "rec2",
            &fields(json!({"_index": "not an ordinal"})),
            None,
        )
        .unwrap();
        let err = registry.register(clashing.main()).unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { .. }));
    }

    #[test]
    fn test_reregistering_same_record_is_idempotent() {
        let mut registry = TableRegistry::new();
        let out = flatten_record("orders", "rec1", &fields(json!({"Name": "a"})), None).unwrap();
        registry.register(out.main()).unwrap();
        registry.register(out.main()).unwrap();

        assert_eq!(
            registry.get("orders").unwrap().column_names(),
            vec!["record_id", "Name"]
        );
    }
}
