//! CLI runner - executes commands

use crate::catalog::Catalog;
use crate::cli::commands::{Cli, Commands};
use crate::config::{parse_object_list, PipelineConfig};
use crate::engine::{Pipeline, PipelineSettings, RunSummary};
use crate::error::Result;
use crate::output::sink_for;
use crate::source::HttpRecordSource;
use crate::staging::{DuckDbStore, StagingStore};
use crate::state::{RunState, StateManager};
use crate::types::scalar_to_string;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

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
            Commands::Run { .. } => self.extract().await,
            Commands::Check => self.check().await,
            Commands::Objects => self.list_objects(),
        }
    }

    /// Load the config file (if any), environment overrides and `run` flags
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        config.apply_env()?;

        if let Commands::Run {
            objects,
            output,
            format,
            no_dependent,
            staging,
            state,
        } = &self.cli.command
        {
            if let Some(objects) = objects {
                config.objects = parse_object_list(objects);
            }
            if let Some(output) = output {
                config.output_dir.clone_from(output);
            }
            if let Some(format) = format {
                config.output_format = *format;
            }
            if *no_dependent {
                config.include_dependent = false;
            }
            if staging.is_some() {
                config.staging_path.clone_from(staging);
            }
            if state.is_some() {
                config.state_file.clone_from(state);
            }
        }

        config.validate()?;
        debug!(config = ?config, "Loaded configuration");
        Ok(config)
    }

    /// Build the HTTP source and validate its credentials
    async fn connect(config: &PipelineConfig) -> Result<HttpRecordSource> {
        let api_key = config.api_key()?;
        let source = HttpRecordSource::new(
            &config.base_url,
            api_key,
            config.http.timeout(),
            Some(config.http.requests_per_second),
        )?;
        source.connect().await?;
        info!(base_url = %config.base_url, "Connected to Fidoo API");
        Ok(source)
    }

    async fn extract(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = config.load_catalog()?;
        let source = Self::connect(&config).await?;

        let store: Box<dyn StagingStore> = match &config.staging_path {
            Some(path) => Box::new(DuckDbStore::open(path)?),
            None => Box::new(DuckDbStore::in_memory()?),
        };
        let sink = sink_for(config.output_format, &config.output_bucket);

        let settings = PipelineSettings::new()
            .with_page_size(config.page_size)
            .with_dependent(config.include_dependent)
            .with_output_dir(&config.output_dir)
            .with_retry(config.http.retry_policy());

        let state = config.state_file.as_ref().map(StateManager::new);
        if let Some(previous) = match &state {
            Some(manager) => manager.load().await?,
            None => None,
        } {
            info!(
                last_run = %previous.last_run,
                records = previous.total(),
                "Previous run state"
            );
        }

        let mut pipeline =
            Pipeline::new(Arc::new(source), store, sink, catalog).with_settings(settings);
        let summary = pipeline.run(&config.objects).await?;

        print!("{}", render_summary(&summary));

        if let Some(manager) = state {
            let run_state = RunState::now(
                summary
                    .object_counts
                    .iter()
                    .map(|(name, count)| (name.as_str(), *count)),
            );
            manager.save(&run_state).await?;
            info!(path = %manager.path().display(), "Saved run state");
        }

        Ok(())
    }

    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        Self::connect(&config).await?;
        println!("Connection successful");
        Ok(())
    }

    fn list_objects(&self) -> Result<()> {
        let catalog = self.load_catalog_only()?;

        println!("{:<24} {:<40} SOURCE", "OBJECT", "ENDPOINT");
        for object in catalog.objects() {
            println!("{:<24} {:<40} -", object.name, object.endpoint);
        }
        for job in catalog.dependents() {
            let key = job.source_key.as_deref().unwrap_or("?");
            println!(
                "{:<24} {:<40} {}.{key}",
                job.name, job.endpoint, job.source
            );
        }
        Ok(())
    }

    /// Catalog named by the config file, without requiring an API key
    fn load_catalog_only(&self) -> Result<Catalog> {
        let config = match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        config.load_catalog()
    }
}

/// Human-readable table of per-object counts, failures and timing
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{:<28} {:>10}  STATUS", "OBJECT", "RECORDS");
    for (name, count) in &summary.object_counts {
        let status = if let Some(f) = summary.failures.iter().find(|f| &f.object == name) {
            format!("failed: {}", f.message)
        } else if let Some(p) = summary.partial_for(name) {
            format!("partial: {} of {} ids failed", p.failed.len(), p.attempted)
        } else {
            "ok".to_string()
        };
        let _ = writeln!(out, "{name:<28} {count:>10}  {status}");
    }

    for partial in &summary.partial {
        for failure in &partial.failed {
            let _ = writeln!(
                out,
                "  {}[{}]: {}",
                partial.object,
                scalar_to_string(&failure.id),
                failure.message
            );
        }
    }
    let _ = writeln!(out, "{}", "-".repeat(48));
    let _ = writeln!(out, "{:<28} {:>10}", "TOTAL", summary.total_records());

    if !summary.tables.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<28} {:>10}  FILE", "TABLE", "ROWS");
        for table in &summary.tables {
            let _ = writeln!(
                out,
                "{:<28} {:>10}  {}",
                table.name,
                table.rows,
                table.path.display()
            );
        }
    }

    if !summary.profile.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<48} {:>10} {:>6}", "TIMING", "SECONDS", "CALLS");
        for entry in summary.profile.iter() {
            let _ = writeln!(
                out,
                "{:<48} {:>10} {:>6}",
                entry.key,
                seconds(entry.total),
                entry.calls
            );
        }
    }

    out
}

fn seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}
