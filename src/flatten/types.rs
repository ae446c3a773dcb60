//! Types produced by the flattener

use crate::error::{Error, Result};
use crate::types::Row;
use std::collections::HashMap;
use std::fmt;

/// Separator between a field name and a nested object key (`Address_City`)
pub const SUBOBJECT_SEP: char = '_';

/// Separator between a table name and a child-table field (`orders__items`)
pub const CHILD_TABLE_SEP: &str = "__";

/// Primary-key column of the main table
pub const RECORD_ID_COLUMN: &str = "record_id";

/// Ordinal column of child tables: a dotted position path (`"2"`, `"2.0"`)
/// within the record's lists. Assumes Airtable preserves list order across
/// re-runs of the same record; keys built from it are only as stable as
/// that ordering.
pub const INDEX_COLUMN: &str = "_index";

/// Suffix of the foreign-key column carried by every child table
/// (`{main_table}_record_id`, holding the root record's id at every depth)
pub const FOREIGN_KEY_SUFFIX: &str = "_record_id";

// ============================================================================
// Column roles
// ============================================================================

/// What a column is for. A name reused with a different role within one run
/// is a schema conflict, never silently resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// The main table's primary key
    RecordId,
    /// A child table's reference to the root record
    ForeignKey,
    /// A child table's per-item ordinal
    Ordinal,
    /// An ordinary value column
    Data,
}

impl ColumnRole {
    /// Short description used in conflict messages
    pub fn describe(self) -> &'static str {
        match self {
            ColumnRole::RecordId => "record-id column",
            ColumnRole::ForeignKey => "foreign-key column",
            ColumnRole::Ordinal => "ordinal column",
            ColumnRole::Data => "data column",
        }
    }
}

/// A named column with its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, unique within its table
    pub name: String,
    /// Role the name is bound to
    pub role: ColumnRole,
}

// ============================================================================
// Per-table output fragment
// ============================================================================

/// Rows and column metadata one record produced for one table
#[derive(Debug, Clone)]
pub struct TableRows {
    /// Output table name
    pub name: String,
    /// Columns in first-seen order
    pub columns: Vec<Column>,
    /// Rows produced by this record
    pub rows: Vec<Row>,
    roles: HashMap<String, ColumnRole>,
}

impl TableRows {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            roles: HashMap::new(),
        }
    }

    /// Role currently bound to a column name, if seen
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.roles.get(column).copied()
    }

    /// Record a column sighting, enforcing role consistency.
    pub(crate) fn note_column(&mut self, name: &str, role: ColumnRole) -> Result<()> {
        match self.roles.get(name).copied() {
            None => {
                self.roles.insert(name.to_string(), role);
                self.columns.push(Column {
                    name: name.to_string(),
                    role,
                });
                Ok(())
            }
            Some(existing) if existing == role => Ok(()),
            Some(existing) => Err(Error::schema_conflict(
                &self.name,
                name,
                format!(
                    "used as both a {} and a {}",
                    existing.describe(),
                    role.describe()
                ),
            )),
        }
    }

    /// Column names in first-seen order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal data-quality conditions observed while flattening.
///
/// These are logged and the run continues; they never block a state commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlattenWarning {
    /// A list mixed objects with scalar entries; the scalars were skipped
    MixedList {
        table: String,
        field: String,
        skipped: usize,
    },
    /// A synthesized column name collided with an existing column on the
    /// same row; the later value won
    ColumnCollision { table: String, column: String },
}

impl fmt::Display for FlattenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenWarning::MixedList {
                table,
                field,
                skipped,
            } => write!(
                f,
                "field '{field}' mixes objects and scalars; skipped {skipped} scalar entries while filling table '{table}'"
            ),
            FlattenWarning::ColumnCollision { table, column } => write!(
                f,
                "column '{column}' in table '{table}' was produced twice for one row; the later value won"
            ),
        }
    }
}

// ============================================================================
// Whole-record output
// ============================================================================

/// Everything one record flattened into: an ordered mapping of table name
/// to rows, plus collected warnings.
#[derive(Debug, Clone, Default)]
pub struct FlattenedRecord {
    /// Tables in first-seen order; the main table is always first
    pub tables: Vec<TableRows>,
    /// Non-fatal conditions observed along the way
    pub warnings: Vec<FlattenWarning>,
}

impl FlattenedRecord {
    /// Look up one table's output by name
    pub fn table(&self, name: &str) -> Option<&TableRows> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The main table's output
    pub fn main(&self) -> &TableRows {
        &self.tables[0]
    }

    /// Total rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}
