// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Airlift
//!
//! Extracts records from an Airtable base and materializes them as
//! relational tables ready for warehouse loading.
//!
//! ## Features
//!
//! - **Record flattening**: nested objects become prefixed columns, lists of
//!   objects fan out into joinable child tables
//! - **Incremental sync**: date-window filtering compiled into Airtable
//!   formulas, with persisted per-table cursors
//! - **Parquet output**: full-replace or upsert-by-key materialization,
//!   optionally uploaded to S3/GCS/Azure
//! - **Polite fetching**: retries with backoff and token-bucket rate
//!   limiting tuned to Airtable's 5 req/s limit
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airlift::{config::ExtractorConfig, engine::ExtractEngine, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ExtractorConfig::from_file("config.yaml")?;
//!     let summary = ExtractEngine::from_config(config, "out/", "state.json")?
//!         .run()
//!         .await?;
//!     println!("{} records -> {} tables", summary.records_fetched, summary.tables.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        ExtractEngine                          │
//! │  window → formula → fetch pages → flatten → register → flush  │
//! └───────────────────────────────────────────────────────────────┘
//!             │                │                    │
//! ┌───────────┴────┬───────────┴────────┬───────────┴───────────┐
//! │    Airtable    │      Flatten       │        Output         │
//! ├────────────────┼────────────────────┼───────────────────────┤
//! │ offset paging  │ scalars → columns  │ rows → Arrow batches  │
//! │ rate limit     │ objects → prefixes │ Parquet per table     │
//! │ retry/backoff  │ lists → child rows │ full / upsert merge   │
//! └────────────────┴────────────────────┴───────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration row: source, sync options, destination
pub mod config;

/// Date-window resolution for incremental sync
pub mod window;

/// Airtable filter-formula compilation
pub mod formula;

/// Record flattening and child-table fan-out
pub mod flatten;

/// Additive per-table schema accumulation
pub mod registry;

/// HTTP client with retry and rate limiting
pub mod http;

/// Airtable REST API client and record types
pub mod airtable;

/// Sync-state persistence between runs
pub mod state;

/// Table writer boundary and Parquet materialization
pub mod output;

/// Main extraction engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::ExtractorConfig;
pub use engine::{ExtractEngine, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
