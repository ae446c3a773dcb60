//! Record flattening and child-table fan-out
//!
//! This is the core of the extractor: one Airtable record (a mapping of
//! field name to JSON value) becomes rows across one or more logical tables.
//!
//! Classification per field:
//! 1. scalar → a main-table column, verbatim
//! 2. list of scalars → one main-table column holding the list as JSON text
//! 3. list of objects → excluded from the main row; one row per object in
//!    the child table `{table}__{field}`, keyed by the parent's record id
//!    and a per-item ordinal
//! 4. nested object → flattened into the same row as `{field}_{key}` columns
//! 5. missing/null → the column is omitted from that row
//!
//! The flattener is a pure function over one record; cross-record schema
//! accumulation lives in [`crate::registry`].

mod flattener;
mod types;


pub use flattener::flatten_record;
pub use types::{
    Column, ColumnRole, FlattenWarning, FlattenedRecord, TableRows, CHILD_TABLE_SEP,
    FOREIGN_KEY_SUFFIX, INDEX_COLUMN, RECORD_ID_COLUMN, SUBOBJECT_SEP,
};
