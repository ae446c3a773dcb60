//! Configuration types for extraction rows
//!
//! One `ExtractorConfig` describes one source table and how to sync it:
//! where the records come from, which fields to keep, the sync window
//! settings, and the destination table.

use crate::error::{Error, Result};
use crate::types::{LoadMode, OptionStringExt, SyncMode, TimestampField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default `date_from` expression
pub const DEFAULT_DATE_FROM: &str = "last run";

/// Default `date_to` expression
pub const DEFAULT_DATE_TO: &str = "now";

// ============================================================================
// Top-Level Extractor Config
// ============================================================================

/// Complete configuration row loaded from YAML or JSON
#[derive(Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Airtable personal access token
    #[serde(default)]
    pub api_token: String,

    /// Airtable base id (e.g. "appXXXXXXXXXXXXXX")
    pub base_id: String,

    /// Source table name or id
    pub table_name: String,

    /// Whether to read through a view
    #[serde(default)]
    pub use_view: bool,

    /// View name, required when `use_view` is set
    #[serde(default)]
    pub view_name: Option<String>,

    /// Top-level field allowlist (empty = all fields)
    #[serde(default)]
    pub fields: Vec<String>,

    /// User-supplied Airtable filter formula, passed through verbatim
    #[serde(default)]
    pub filter_formula: Option<String>,

    /// Sync window settings
    #[serde(default)]
    pub sync_options: SyncOptions,

    /// Destination settings
    #[serde(default)]
    pub destination: DestinationConfig,
}

// Token is a credential; keep it out of logs.
impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_token", &"***")
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("use_view", &self.use_view)
            .field("view_name", &self.view_name)
            .field("fields", &self.fields)
            .field("filter_formula", &self.filter_formula)
            .field("sync_options", &self.sync_options)
            .field("destination", &self.destination)
            .finish()
    }
}

impl ExtractorConfig {
    /// Load a configuration row from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            let config: Self = serde_yaml::from_str(&content)?;
            Ok(config)
        }
    }

    /// Load a configuration row from an inline JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Validate required and mutually-dependent settings.
    ///
    /// All configuration problems surface here, before any fetch.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::missing_field("api_token"));
        }
        if self.base_id.is_empty() {
            return Err(Error::missing_field("base_id"));
        }
        if self.table_name.is_empty() {
            return Err(Error::missing_field("table_name"));
        }
        if self.use_view && self.view_name.clone().none_if_empty().is_none() {
            return Err(Error::invalid_value(
                "view_name",
                "use_view is set but no view_name given",
            ));
        }
        if let Some(name) = &self.destination.table_name {
            if name.is_empty() {
                return Err(Error::invalid_value(
                    "destination.table_name",
                    "override must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Effective view name, when reading through a view
    pub fn view(&self) -> Option<&str> {
        if self.use_view {
            self.view_name.as_deref().filter(|v| !v.is_empty())
        } else {
            None
        }
    }

    /// Effective field allowlist (None = all fields)
    pub fn field_allowlist(&self) -> Option<&[String]> {
        if self.fields.is_empty() {
            None
        } else {
            Some(&self.fields)
        }
    }

    /// Destination table name: configured override or the source table name
    pub fn destination_table(&self) -> &str {
        self.destination
            .table_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.table_name)
    }

    /// Load mode derived from the destination settings
    pub fn load_mode(&self) -> LoadMode {
        if self.destination.incremental_loading {
            LoadMode::Incremental
        } else {
            LoadMode::Full
        }
    }
}

// ============================================================================
// Sync Options
// ============================================================================

/// Sync window settings for a configuration row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Full or incremental sync
    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Window start: absolute date, relative expression, or "last run"
    #[serde(default = "default_date_from")]
    pub date_from: String,

    /// Window end: absolute date, relative expression, or "now"
    #[serde(default = "default_date_to")]
    pub date_to: String,

    /// Which Airtable timestamp function the window filters on
    #[serde(default)]
    pub timestamp_field: TimestampField,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            date_from: default_date_from(),
            date_to: default_date_to(),
            timestamp_field: TimestampField::default(),
        }
    }
}

fn default_date_from() -> String {
    DEFAULT_DATE_FROM.to_string()
}

fn default_date_to() -> String {
    DEFAULT_DATE_TO.to_string()
}

// ============================================================================
// Destination Config
// ============================================================================

/// Destination settings for a configuration row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Output table name override (None = source table name)
    #[serde(default)]
    pub table_name: Option<String>,

    /// When set, rows are upserted by primary key instead of replacing
    /// the destination each run
    #[serde(default)]
    pub incremental_loading: bool,
}
