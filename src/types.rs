//! Common types used throughout Airlift
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One output row: column name to scalar JSON value, insertion-ordered
pub type Row = JsonObject;

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for a configuration row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Fetch all records every time, no date filter
    #[default]
    FullSync,
    /// Only fetch records within the resolved date window
    IncrementalSync,
}

// ============================================================================
// Load Mode
// ============================================================================

/// How an output table is written to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Destination overwritten each run
    #[default]
    Full,
    /// Rows upserted by primary key
    Incremental,
}

// ============================================================================
// Timestamp Field
// ============================================================================

/// Which Airtable timestamp function the incremental window filters on.
///
/// Airtable has no "modified within" list parameter, so the window is
/// compiled into a formula over one of these functions. Bases differ in
/// which one is meaningful, so this is configurable rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampField {
    /// `CREATED_TIME()`
    CreatedTime,
    /// `LAST_MODIFIED_TIME()`
    #[default]
    LastModifiedTime,
}

impl TimestampField {
    /// The Airtable formula call for this field
    pub fn formula_call(self) -> &'static str {
        match self {
            TimestampField::CreatedTime => "CREATED_TIME()",
            TimestampField::LastModifiedTime => "LAST_MODIFIED_TIME()",
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_serde() {
        let mode: SyncMode = serde_json::from_str("\"incremental_sync\"").unwrap();
        assert_eq!(mode, SyncMode::IncrementalSync);

        let json = serde_json::to_string(&SyncMode::FullSync).unwrap();
        assert_eq!(json, "\"full_sync\"");
    }

    #[test]
    fn test_load_mode_default() {
        assert_eq!(LoadMode::default(), LoadMode::Full);
    }

    #[test]
    fn test_timestamp_field_formula_call() {
        assert_eq!(
            TimestampField::CreatedTime.formula_call(),
            "CREATED_TIME()"
        );
        assert_eq!(
            TimestampField::LastModifiedTime.formula_call(),
            "LAST_MODIFIED_TIME()"
        );
    }

    #[test]
    fn test_timestamp_field_serde() {
        let field: TimestampField = serde_json::from_str("\"created_time\"").unwrap();
        assert_eq!(field, TimestampField::CreatedTime);
        assert_eq!(TimestampField::default(), TimestampField::LastModifiedTime);
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
        assert_eq!("test".to_string().none_if_empty(), Some("test".to_string()));
        assert_eq!(String::new().none_if_empty(), None);
    }
}
