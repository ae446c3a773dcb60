//! CLI module
//!
//! Command-line interface for running extractions.
//!
//! # Commands
//!
//! - `run` - Extract a table into Parquet outputs
//! - `check` - Test credentials and table access
//! - `validate` - Validate a configuration row
//! - `preview` - Fetch a few records and show the tables they fan out into

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
