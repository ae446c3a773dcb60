//! Airtable wire types

use crate::types::JsonObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw Airtable record as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableRecord {
    /// Record id, globally unique within the table and immutable
    pub id: String,

    /// Server-side creation timestamp
    #[serde(rename = "createdTime", default)]
    pub created_time: Option<DateTime<Utc>>,

    /// Field name to JSON value; empty fields are absent, not null
    #[serde(default)]
    pub fields: JsonObject,
}

/// One page of the record listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPage {
    /// Records on this page
    #[serde(default)]
    pub records: Vec<AirtableRecord>,

    /// Continuation token; absent on the last page
    #[serde(default)]
    pub offset: Option<String>,
}

impl RecordPage {
    /// Whether another page follows this one
    pub fn has_more(&self) -> bool {
        self.offset.is_some()
    }
}

/// Parameters of one record listing
#[derive(Debug, Clone)]
pub struct ListRecordsRequest {
    /// Airtable base id
    pub base_id: String,
    /// Source table name or id
    pub table_name: String,
    /// Optional view to read through
    pub view: Option<String>,
    /// Compiled `filterByFormula` predicate
    pub filter_formula: Option<String>,
    /// Top-level fields to fetch (empty = all)
    pub fields: Vec<String>,
    /// Records per page
    pub page_size: usize,
}

impl ListRecordsRequest {
    /// Create a request for all records of a table
    pub fn new(base_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            table_name: table_name.into(),
            view: None,
            filter_formula: None,
            fields: Vec::new(),
            page_size: super::DEFAULT_PAGE_SIZE,
        }
    }

    /// Read through a view
    #[must_use]
    pub fn with_view(mut self, view: Option<String>) -> Self {
        self.view = view;
        self
    }

    /// Restrict with a filter formula
    #[must_use]
    pub fn with_filter(mut self, formula: Option<String>) -> Self {
        self.filter_formula = formula;
        self
    }

    /// Restrict the fetched fields
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }
}
