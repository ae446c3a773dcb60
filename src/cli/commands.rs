//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Airlift - Airtable to warehouse-ready tables
#[derive(Parser, Debug)]
#[command(name = "airlift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration row file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline configuration JSON (takes precedence over --config)
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON); omit for a stateless run
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Output format for summaries and previews
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the configured table into Parquet outputs
    ///
    /// Child tables carry `{table}_record_id` and `_index` columns; with
    /// incremental loading their composite keys assume Airtable keeps list
    /// order stable across re-runs of a record.
    Run {
        /// Output directory for Parquet files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Upload finished files to a cloud URL
        /// Supports: s3://bucket/path, r2://bucket/path, gs://bucket/path, az://container/path
        #[arg(long)]
        upload: Option<String>,

        /// Buffered rows that trigger a flush to the writer
        #[arg(long)]
        flush_threshold: Option<usize>,
    },

    /// Test credentials and table access
    Check,

    /// Validate the configuration row
    Validate,

    /// Fetch a few records and show the tables they fan out into
    Preview {
        /// Records to fetch
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Pretty,
}
