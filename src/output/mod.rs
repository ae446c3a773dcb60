//! Table writer boundary and Parquet materialization
//!
//! The engine talks to a [`TableWriter`]: named tabular outputs with a
//! declared primary key and load mode. The shipped implementation
//! materializes one Parquet file per table, replacing it (full load) or
//! merging by primary key (incremental load), and can push finished files
//! to cloud object storage.

mod cloud;
mod schema;
mod writer;

#[cfg(test)]
mod tests;

pub use cloud::CloudDestination;
pub use schema::{batch_to_rows, build_schema, rows_to_batch};
pub use writer::{ParquetDestination, ParquetWriterConfig, TableWriter, WrittenTable};
