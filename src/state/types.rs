//! State types persisted between runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete persisted state, keyed by destination table name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-table cursors
    #[serde(default)]
    pub tables: HashMap<String, TableCursor>,
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Last successful run start for a table, if any
    pub fn get_last_run(&self, table: &str) -> Option<DateTime<Utc>> {
        self.tables.get(table).map(|c| c.last_run)
    }

    /// Record a successful run start for a table
    pub fn set_last_run(&mut self, table: &str, last_run: DateTime<Utc>) {
        self.tables
            .entry(table.to_string())
            .or_insert_with(|| TableCursor { last_run })
            .last_run = last_run;
    }
}

/// Cursor for a single destination table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCursor {
    /// When the most recent successful run started
    pub last_run: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_state_default() {
        let state = SyncState::new();
        assert!(state.tables.is_empty());
        assert!(state.get_last_run("orders").is_none());
    }

    #[test]
    fn test_state_last_run() {
        let mut state = SyncState::new();
        state.set_last_run("orders", ts("2024-06-10T08:00:00Z"));
        assert_eq!(
            state.get_last_run("orders"),
            Some(ts("2024-06-10T08:00:00Z"))
        );

        // Later runs overwrite
        state.set_last_run("orders", ts("2024-06-15T12:00:00Z"));
        assert_eq!(
            state.get_last_run("orders"),
            Some(ts("2024-06-15T12:00:00Z"))
        );
        assert_eq!(state.tables.len(), 1);
    }

    #[test]
    fn test_state_serialization() {
        let mut state = SyncState::new();
        state.set_last_run("orders", ts("2024-06-10T08:00:00Z"));

        let json = serde_json::to_string(&state).unwrap();
        let restored: SyncState = serde_json::from_str(&json).unwrap();

        assert_eq!(
            restored.get_last_run("orders"),
            Some(ts("2024-06-10T08:00:00Z"))
        );
    }
}
