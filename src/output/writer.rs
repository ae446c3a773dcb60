//! Table writer boundary and the Parquet implementation

use super::schema::{batch_to_rows, rows_to_batch};
use crate::error::{Error, Result};
use crate::types::{LoadMode, Row};
use async_trait::async_trait;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// The sink the engine writes accumulated rows into.
///
/// The engine guarantees that `rows` share the table's currently-registered
/// column superset (missing columns are absent, read as null on load) and
/// that `primary_key` is stable across calls for the same table within a
/// run. Writer failures are fatal for the run; the engine does not retry.
#[async_trait]
pub trait TableWriter: Send {
    /// Accept one flush of rows for a table
    async fn write(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Row>,
        primary_key: &[String],
        load_mode: LoadMode,
    ) -> Result<()>;

    /// Materialize everything accepted so far. Called once, after the last
    /// flush; nothing is committed until it returns.
    async fn finish(&mut self) -> Result<Vec<WrittenTable>>;
}

/// One materialized output table
#[derive(Debug, Clone)]
pub struct WrittenTable {
    /// Output table name
    pub table: String,
    /// Where the table landed
    pub path: PathBuf,
    /// Rows in the final file
    pub rows: usize,
    /// How the table was loaded
    pub load_mode: LoadMode,
}

// ============================================================================
// Parquet writer configuration
// ============================================================================

/// Configuration for Parquet materialization
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

// ============================================================================
// Parquet destination
// ============================================================================

/// Accumulates flushed rows per table and materializes one Parquet file per
/// table on `finish`
pub struct ParquetDestination {
    dir: PathBuf,
    config: ParquetWriterConfig,
    pending: HashMap<String, PendingTable>,
    order: Vec<String>,
}

struct PendingTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    primary_key: Vec<String>,
    load_mode: LoadMode,
}

impl ParquetDestination {
    /// Create a destination rooted at a directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::output(format!("Failed to create output dir {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            config: ParquetWriterConfig::default(),
            pending: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Override the Parquet writer configuration
    #[must_use]
    pub fn with_writer_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Path of one table's output file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", table.replace('/', "_")))
    }

    fn write_file(&self, path: &Path, columns: &[String], rows: &[Row]) -> Result<()> {
        let batch = rows_to_batch(columns, rows)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("parquet.tmp");
        let file = File::create(&temp_path)
            .map_err(|e| Error::output(format!("Failed to create {}: {e}", temp_path.display())))?;
        let mut writer =
            ArrowWriter::try_new(file, batch.schema(), Some(self.config.build_properties()))?;
        writer.write(&batch)?;
        writer.close()?;

        std::fs::rename(&temp_path, path)
            .map_err(|e| Error::output(format!("Failed to rename {}: {e}", path.display())))?;
        Ok(())
    }
}

/// Read all rows back out of an existing Parquet file
fn read_parquet_rows(path: &Path) -> Result<(Vec<String>, Vec<Row>)> {
    let file = File::open(path)
        .map_err(|e| Error::output(format!("Failed to open {}: {e}", path.display())))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        if columns.is_empty() {
            columns = batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }
        rows.extend(batch_to_rows(&batch)?);
    }
    Ok((columns, rows))
}

/// Key a row by its primary-key values (missing parts stringify as null)
fn key_of(row: &Row, primary_key: &[String]) -> String {
    primary_key
        .iter()
        .map(|k| row.get(k).map_or_else(|| "null".to_string(), ToString::to_string))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// Merge an incremental flush over existing rows: matching keys are
/// replaced in place (latest run wins), new keys append in arrival order.
pub(crate) fn upsert(existing: Vec<Row>, incoming: Vec<Row>, primary_key: &[String]) -> Vec<Row> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, row)| (key_of(row, primary_key), i))
        .collect();

    for row in incoming {
        let key = key_of(&row, primary_key);
        match index.get(&key).copied() {
            Some(i) => merged[i] = row,
            None => {
                index.insert(key, merged.len());
                merged.push(row);
            }
        }
    }
    merged
}

/// Union of two column orders: existing order first, new columns appended
fn union_columns(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut columns = existing.to_vec();
    for name in incoming {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}

#[async_trait]
impl TableWriter for ParquetDestination {
    async fn write(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Row>,
        primary_key: &[String],
        load_mode: LoadMode,
    ) -> Result<()> {
        if !self.pending.contains_key(table) {
            self.order.push(table.to_string());
        }
        let pending = self
            .pending
            .entry(table.to_string())
            .or_insert_with(|| PendingTable {
                columns: Vec::new(),
                rows: Vec::new(),
                primary_key: primary_key.to_vec(),
                load_mode,
            });
        // The registry only grows, so the latest flush carries the superset
        // of every earlier column order.
        pending.columns = columns.to_vec();
        pending.rows.extend(rows);
        Ok(())
    }

    async fn finish(&mut self) -> Result<Vec<WrittenTable>> {
        let mut written = Vec::with_capacity(self.order.len());

        for table in std::mem::take(&mut self.order) {
            let pending = self
                .pending
                .remove(&table)
                .expect("pending entry exists for every ordered table");
            let path = self.table_path(&table);

            let (columns, rows) = match pending.load_mode {
                LoadMode::Full => (pending.columns, pending.rows),
                LoadMode::Incremental if path.exists() => {
                    let (existing_columns, existing_rows) = read_parquet_rows(&path)?;
                    let columns = union_columns(&existing_columns, &pending.columns);
                    let rows = upsert(existing_rows, pending.rows, &pending.primary_key);
                    (columns, rows)
                }
                LoadMode::Incremental => (pending.columns, pending.rows),
            };

            self.write_file(&path, &columns, &rows)?;
            info!(
                "Wrote {} rows to {} ({:?})",
                rows.len(),
                path.display(),
                pending.load_mode
            );

            written.push(WrittenTable {
                table,
                path,
                rows: rows.len(),
                load_mode: pending.load_mode,
            });
        }

        Ok(written)
    }
}
