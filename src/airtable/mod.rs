//! Airtable REST API client and record types
//!
//! The fetch collaborator: given a base, table and optional view/filter/
//! field subset, yields pages of raw records via the `offset` continuation
//! token. A page stream is finite and not restartable mid-stream; a new
//! listing starts again from page 1.

mod client;
mod types;

#[cfg(test)]
mod tests;

pub use client::{page_stream, AirtableClient, RecordSource, API_BASE_URL, DEFAULT_PAGE_SIZE};
pub use types::{AirtableRecord, ListRecordsRequest, RecordPage};
