//! Main extraction engine
//!
//! Single-threaded, single-pass orchestration of one configuration row:
//! resolve the window, compile the filter, pull pages sequentially, flatten
//! each record atomically, accumulate schemas, and flush buffered rows to
//! the writer to bound memory. The persisted last-run timestamp is updated
//! only after every table has been flushed and materialized successfully.

mod types;


pub use types::RunSummary;

use crate::airtable::{page_stream, AirtableClient, ListRecordsRequest, RecordSource};
use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::flatten::flatten_record;
use crate::formula::compile_filter;
use crate::output::{ParquetDestination, TableWriter};
use crate::registry::TableRegistry;
use crate::state::StateManager;
use crate::types::{LoadMode, Row};
use crate::window::resolve_window;
use chrono::Utc;
use futures::{pin_mut, TryStreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default number of buffered rows that triggers a flush to the writer
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

/// Extraction engine for one configuration row
pub struct ExtractEngine {
    config: ExtractorConfig,
    source: Box<dyn RecordSource>,
    writer: Box<dyn TableWriter>,
    state: StateManager,
    flush_threshold: usize,
}

impl ExtractEngine {
    /// Create an engine with explicit collaborators
    pub fn new(
        config: ExtractorConfig,
        source: Box<dyn RecordSource>,
        writer: Box<dyn TableWriter>,
        state: StateManager,
    ) -> Self {
        Self {
            config,
            source,
            writer,
            state,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    /// Create an engine wired to the real Airtable API, a Parquet output
    /// directory and a state file
    pub fn from_config(
        config: ExtractorConfig,
        output_dir: impl AsRef<Path>,
        state_path: impl AsRef<Path>,
    ) -> Result<Self> {
        config.validate()?;
        let source = AirtableClient::new(config.api_token.clone());
        let writer = ParquetDestination::new(output_dir)?;
        let state = StateManager::from_file(state_path)?;
        Ok(Self::new(config, Box::new(source), Box::new(writer), state))
    }

    /// Set the buffered-row count that triggers a flush
    #[must_use]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// Run the extraction to completion
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        self.config.validate()?;

        let destination_table = self.config.destination_table().to_string();
        let load_mode = self.config.load_mode();

        // Captured once; "now" and relative expressions resolve against
        // this instant for the whole run.
        let run_started_at = Utc::now();
        let last_run = self.state.get_last_run(&destination_table).await;

        let window = resolve_window(&self.config.sync_options, last_run, run_started_at)?;
        let filter = compile_filter(
            self.config.filter_formula.as_deref(),
            window.as_ref(),
            self.config.sync_options.timestamp_field,
        );
        match &filter {
            Some(formula) => debug!("Fetch predicate: {formula}"),
            None => debug!("No fetch predicate, fetching all records"),
        }

        let request = ListRecordsRequest::new(
            self.config.base_id.clone(),
            self.config.table_name.clone(),
        )
            .with_view(self.config.view().map(String::from))
            .with_filter(filter)
            .with_fields(self.config.fields.clone());

        info!(
            "Extracting '{}' from base '{}' into '{destination_table}' ({load_mode:?} load)",
            self.config.table_name, self.config.base_id
        );

        let mut summary = RunSummary::new();
        let mut registry = TableRegistry::new();
        let mut buffers = RowBuffers::new();
        let allowlist = self.config.field_allowlist().map(<[String]>::to_vec);

        let flush_threshold = self.flush_threshold;
        let source = self.source.as_ref();
        let writer = self.writer.as_mut();

        let pages = page_stream(source, &request);
        pin_mut!(pages);
        while let Some(page) = pages.try_next().await? {
            summary.add_page();
            debug!("Fetched page with {} records", page.records.len());

            for record in &page.records {
                let flattened = flatten_record(
                    &destination_table,
                    &record.id,
                    &record.fields,
                    allowlist.as_deref(),
                )?;

                for warning in &flattened.warnings {
                    warn!("{warning}");
                    summary.add_warning();
                }

                summary.add_records(1);
                summary.add_rows(flattened.row_count());
                for table in flattened.tables {
                    registry.register(&table)?;
                    buffers.append(&table.name, table.rows);
                }
            }

            if buffers.buffered() >= flush_threshold {
                flush_buffers(writer, &mut buffers, &registry, load_mode).await?;
            }
        }

        flush_buffers(writer, &mut buffers, &registry, load_mode).await?;
        summary.tables = writer.finish().await?;

        // All tables are on disk; only now does the cursor move.
        self.state
            .set_last_run(&destination_table, run_started_at)
            .await?;

        summary.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Extracted {} records into {} tables in {}ms ({} warnings)",
            summary.records_fetched,
            summary.tables.len(),
            summary.duration_ms,
            summary.warnings
        );

        Ok(summary)
    }
}

/// Hand every non-empty buffer to the writer
async fn flush_buffers(
    writer: &mut dyn TableWriter,
    buffers: &mut RowBuffers,
    registry: &TableRegistry,
    load_mode: LoadMode,
) -> Result<()> {
    for (table, rows) in buffers.drain() {
        let schema = registry
            .get(&table)
            .expect("buffered tables are always registered");
        let columns: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
        let primary_key: Vec<String> =
            schema.primary_key().iter().map(ToString::to_string).collect();
        writer
            .write(&table, &columns, rows, &primary_key, load_mode)
            .await?;
    }
    Ok(())
}

/// Per-table row buffers in first-seen order
struct RowBuffers {
    map: HashMap<String, Vec<Row>>,
    order: Vec<String>,
    buffered: usize,
}

impl RowBuffers {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: Vec::new(),
            buffered: 0,
        }
    }

    fn append(&mut self, table: &str, rows: Vec<Row>) {
        self.buffered += rows.len();
        if !self.map.contains_key(table) {
            self.order.push(table.to_string());
        }
        self.map.entry(table.to_string()).or_default().extend(rows);
    }

    fn buffered(&self) -> usize {
        self.buffered
    }

    fn drain(&mut self) -> Vec<(String, Vec<Row>)> {
        self.buffered = 0;
        let mut drained = Vec::new();
        for table in &self.order {
            if let Some(rows) = self.map.get_mut(table) {
                if !rows.is_empty() {
                    drained.push((table.clone(), std::mem::take(rows)));
                }
            }
        }
        drained
    }
}
