//! CLI runner - executes commands

use crate::airtable::{AirtableClient, ListRecordsRequest, RecordSource};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ExtractorConfig;
use crate::engine::ExtractEngine;
use crate::error::{Error, Result};
use crate::flatten::flatten_record;
use crate::output::{CloudDestination, ParquetDestination};
use crate::state::StateManager;
use serde_json::json;
use std::path::PathBuf;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                output,
                upload,
                flush_threshold,
            } => {
                self.extract(output.clone(), upload.as_deref(), *flush_threshold)
                    .await
            }
            Commands::Check => self.check().await,
            Commands::Validate => self.validate(),
            Commands::Preview { limit } => self.preview(*limit).await,
        }
    }

    /// Load the configuration row
    fn load_config(&self) -> Result<ExtractorConfig> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return ExtractorConfig::from_json_str(json_str);
        }
        if let Some(path) = &self.cli.config {
            return ExtractorConfig::from_file(path);
        }
        Err(Error::config(
            "Configuration not specified (use --config or --config-json)",
        ))
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Run the extraction
    async fn extract(
        &self,
        output: PathBuf,
        upload: Option<&str>,
        flush_threshold: Option<usize>,
    ) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;
        let state = self.load_state()?;

        let source = AirtableClient::new(config.api_token.clone());
        let writer = ParquetDestination::new(&output)?;
        let mut engine =
            ExtractEngine::new(config, Box::new(source), Box::new(writer), state);
        if let Some(threshold) = flush_threshold {
            engine = engine.with_flush_threshold(threshold);
        }

        let summary = engine.run().await?;

        if let Some(url) = upload {
            let destination = CloudDestination::parse(url)?;
            destination.upload_tables(&summary.tables).await?;
        }

        match self.cli.format {
            OutputFormat::Json => {
                let tables: Vec<_> = summary
                    .tables
                    .iter()
                    .map(|t| {
                        json!({
                            "table": t.table,
                            "path": t.path.display().to_string(),
                            "rows": t.rows,
                            "load_mode": format!("{:?}", t.load_mode),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "records_fetched": summary.records_fetched,
                        "pages_fetched": summary.pages_fetched,
                        "rows_emitted": summary.rows_emitted,
                        "warnings": summary.warnings,
                        "duration_ms": summary.duration_ms,
                        "tables": tables,
                    }))?
                );
            }
            OutputFormat::Pretty => {
                println!(
                    "Extracted {} records ({} pages, {} warnings) in {}ms",
                    summary.records_fetched,
                    summary.pages_fetched,
                    summary.warnings,
                    summary.duration_ms
                );
                for table in &summary.tables {
                    println!(
                        "  {} -> {} ({} rows, {:?})",
                        table.table,
                        table.path.display(),
                        table.rows,
                        table.load_mode
                    );
                }
            }
        }

        Ok(())
    }

    /// Test credentials and table access
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        let client = AirtableClient::new(config.api_token.clone());
        client.check(&config.base_id, &config.table_name).await?;
        println!(
            "Connection OK: table '{}' in base '{}' is reachable",
            config.table_name, config.base_id
        );
        Ok(())
    }

    /// Validate the configuration row
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;
        println!(
            "Configuration valid: '{}' -> '{}' ({:?})",
            config.table_name,
            config.destination_table(),
            config.load_mode()
        );
        Ok(())
    }

    /// Fetch a few records and show the tables they fan out into
    async fn preview(&self, limit: usize) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        let client = AirtableClient::new(config.api_token.clone());
        let request = ListRecordsRequest::new(config.base_id.clone(), config.table_name.clone())
            .with_view(config.view().map(String::from))
            .with_filter(config.filter_formula.clone())
            .with_fields(config.fields.clone())
            .with_page_size(limit.max(1));
        let page = client.fetch_page(&request, None).await?;

        let destination_table = config.destination_table().to_string();
        let mut registry = crate::registry::TableRegistry::new();
        let mut rows_by_table: Vec<(String, Vec<crate::types::Row>)> = Vec::new();

        for record in &page.records {
            let flattened = flatten_record(
                &destination_table,
                &record.id,
                &record.fields,
                config.field_allowlist(),
            )?;
            for table in flattened.tables {
                registry.register(&table)?;
                match rows_by_table.iter().position(|(name, _)| *name == table.name) {
                    Some(i) => rows_by_table[i].1.extend(table.rows),
                    None => rows_by_table.push((table.name, table.rows)),
                }
            }
        }

        match self.cli.format {
            OutputFormat::Json => {
                let preview: serde_json::Map<String, serde_json::Value> = rows_by_table
                    .into_iter()
                    .map(|(name, rows)| (name, json!(rows)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&preview)?);
            }
            OutputFormat::Pretty => {
                println!(
                    "{} records from '{}' fan out into {} tables:",
                    page.records.len(),
                    config.table_name,
                    registry.len()
                );
                for (name, rows) in &rows_by_table {
                    let schema = registry.get(name).expect("previewed tables are registered");
                    println!(
                        "  {name} ({} rows) pk=[{}] columns=[{}]",
                        rows.len(),
                        schema.primary_key().join(", "),
                        schema.column_names().join(", ")
                    );
                }
            }
        }

        Ok(())
    }
}
