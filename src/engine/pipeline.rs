//! Three-phase extraction pipeline

use super::types::{
    ExportedTable, IdFailure, ObjectFailure, PartialFailure, PipelineSettings, Profile,
    RunSummary,
};
use crate::catalog::{Catalog, ObjectDefinition};
use crate::error::{Error, Result};
use crate::normalize::{normalize, resolve_key, Table, TableKey, SATELLITE_SEPARATOR};
use crate::output::TabularSink;
use crate::pagination::PaginatedFetcher;
use crate::partition::{DependentJob, DependentResolver, ResolveOutcome};
use crate::source::RecordSource;
use crate::staging::StagingStore;
use crate::types::{JsonObject, Record};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs primary extraction, dependent resolution and export for a set of
/// object types.
///
/// The pipeline owns its staging store and sink for its whole lifetime.
pub struct Pipeline {
    source: Arc<dyn RecordSource>,
    store: Box<dyn StagingStore>,
    sink: Box<dyn TabularSink>,
    catalog: Catalog,
    settings: PipelineSettings,
    /// Key chosen by the normalizer for each object table staged by this pipeline
    keys: HashMap<String, TableKey>,
}

impl Pipeline {
    /// Create a pipeline with default settings
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: Box<dyn StagingStore>,
        sink: Box<dyn TabularSink>,
        catalog: Catalog,
    ) -> Self {
        Self {
            source,
            store,
            sink,
            catalog,
            settings: PipelineSettings::default(),
            keys: HashMap::new(),
        }
    }

    /// Set run settings
    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Get the settings
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the staging store
    pub fn store(&self) -> &dyn StagingStore {
        self.store.as_ref()
    }

    /// Run all three phases for `objects`.
    ///
    /// A failing object type is logged, counted as zero and skipped. Only a
    /// broken staging store or an unwritable output aborts the run.
    pub async fn run(&mut self, objects: &[String]) -> Result<RunSummary> {
        let started = Instant::now();
        let requested = dedup(objects);
        let mut summary = RunSummary::default();
        let mut profile = Profile::new();

        info!(objects = ?requested, "Starting pipeline run");

        // Phase 1: primary objects
        for name in &requested {
            let Some(definition) = self.catalog.object(name).cloned() else {
                if self.catalog.dependent(name).is_none() {
                    let e = Error::UnknownObject { name: name.clone() };
                    error!(object = %name, "{e}");
                    summary.object_counts.push((name.clone(), 0));
                    summary.failures.push(failure(name, &e));
                }
                continue;
            };

            let count = match self.extract_primary(&definition, &mut profile).await {
                Ok(count) => count,
                Err(e) if e.is_not_found() => {
                    warn!(object = %name, error = %e, "Object not found or empty");
                    0
                }
                Err(e) => {
                    error!(object = %name, error = %e, "Extraction failed");
                    summary.failures.push(failure(name, &e));
                    0
                }
            };
            summary.object_counts.push((name.clone(), count));
        }

        // Phase 2: dependent objects
        let jobs: Vec<DependentJob> = self.catalog.dependents_for(&requested).cloned().collect();
        for job in jobs {
            if !self.settings.include_dependent {
                if requested.contains(&job.name) {
                    info!(object = %job.name, "Dependent phase disabled, skipping");
                    summary.object_counts.push((job.name.clone(), 0));
                }
                continue;
            }

            let dependent_started = Instant::now();
            let result = self.extract_dependent(&job, &mut profile).await;
            profile.record(
                format!("dependent:{}", job.name),
                dependent_started.elapsed(),
            );

            let count = match result {
                Ok((count, partial)) => {
                    summary.partial.extend(partial);
                    count
                }
                Err(e) => {
                    error!(object = %job.name, error = %e, "Dependent extraction failed");
                    summary.failures.push(failure(&job.name, &e));
                    0
                }
            };
            summary.object_counts.push((job.name.clone(), count));
        }

        // Phase 3: export
        let export_started = Instant::now();
        summary.tables = self.export()?;
        profile.record("stage:export", export_started.elapsed());

        summary.profile = profile;
        info!(
            objects = summary.object_counts.len(),
            records = summary.total_records(),
            tables = summary.tables.len(),
            failed = summary.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline run finished"
        );
        Ok(summary)
    }

    async fn extract_primary(
        &mut self,
        definition: &ObjectDefinition,
        profile: &mut Profile,
    ) -> Result<usize> {
        info!(object = %definition.name, endpoint = %definition.endpoint, "Extracting object");
        self.clear_object(&definition.name)?;

        let source = Arc::clone(&self.source);
        let fetcher = PaginatedFetcher::new(source.as_ref(), self.settings.retry.clone());

        let fetch_started = Instant::now();
        let records = fetcher
            .collect_all(
                &definition.endpoint,
                self.settings.page_size,
                JsonObject::new(),
            )
            .await;
        profile.record(
            format!("fetch:{}", definition.endpoint),
            fetch_started.elapsed(),
        );

        self.stage(
            &definition.name,
            records?,
            definition.primary_key.as_deref(),
            profile,
        )
    }

    async fn extract_dependent(
        &mut self,
        job: &DependentJob,
        profile: &mut Profile,
    ) -> Result<(usize, Option<PartialFailure>)> {
        info!(
            object = %job.name,
            source = %job.source,
            endpoint = %job.endpoint,
            "Resolving dependent object"
        );
        self.clear_object(&job.name)?;

        let source = Arc::clone(&self.source);
        let resolver = DependentResolver::new(
            PaginatedFetcher::new(source.as_ref(), self.settings.retry.clone()),
            self.settings.page_size,
        );

        let outcome = resolver.resolve(job, self.store.as_ref(), profile).await?;
        match outcome {
            ResolveOutcome::SourceMissing => {
                warn!(
                    object = %job.name,
                    source = %job.source,
                    "Source table not staged, skipping"
                );
                Ok((0, None))
            }
            ResolveOutcome::Resolved(resolution) => {
                let partial = resolution.has_failures().then(|| {
                    warn!(
                        object = %job.name,
                        failed = resolution.failures.len(),
                        ids = resolution.ids,
                        "Some parent ids could not be fetched"
                    );
                    PartialFailure {
                        object: job.name.clone(),
                        attempted: resolution.ids,
                        failed: resolution
                            .failures
                            .iter()
                            .map(|(id, e)| IdFailure {
                                id: id.clone(),
                                message: e.to_string(),
                            })
                            .collect(),
                    }
                });
                let count = self.stage(&job.name, resolution.records, None, profile)?;
                Ok((count, partial))
            }
        }
    }

    /// Normalize `records` and replace every resulting table in the store.
    ///
    /// Returns the row count of the object's own table.
    fn stage(
        &mut self,
        name: &str,
        records: Vec<Record>,
        primary_key: Option<&str>,
        profile: &mut Profile,
    ) -> Result<usize> {
        let normalize_started = Instant::now();
        let normalized = normalize(name, records, primary_key)?;
        profile.record("stage:normalize", normalize_started.elapsed());

        if normalized.key.is_missing() && !normalized.table.is_empty() {
            warn!(
                object = %name,
                "No primary key could be inferred, satellites get a null parent_id"
            );
        }

        let count = normalized.table.len();
        let key = normalized.key.clone();
        let staging_started = Instant::now();
        let staged = self.stage_tables(name, normalized.into_tables());
        profile.record("stage:staging", staging_started.elapsed());
        staged?;
        self.keys.insert(name.to_string(), key);

        info!(object = %name, records = count, "Staged object");
        Ok(count)
    }

    /// Write every table of one object, or none of them
    fn stage_tables(&mut self, name: &str, tables: Vec<Table>) -> Result<()> {
        for table in tables {
            match self.store.create_or_replace(&table.name, &table.records) {
                Ok(rows) => debug!(table = %table.name, rows, "Staged table"),
                Err(e) => {
                    if let Err(cleanup) = self.clear_object(name) {
                        error!(object = %name, error = %cleanup, "Failed to roll back staged tables");
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Drop the object's table and all its satellites from earlier runs
    fn clear_object(&mut self, name: &str) -> Result<()> {
        self.keys.remove(name);
        let prefix = format!("{name}{SATELLITE_SEPARATOR}");
        for table in self.store.list_tables()? {
            if table == name || table.starts_with(&prefix) {
                self.store.drop_table(&table)?;
            }
        }
        Ok(())
    }

    /// Write every non-empty staged table through the sink
    fn export(&self) -> Result<Vec<ExportedTable>> {
        let output_dir = &self.settings.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|e| {
            Error::output(format!("Failed to create {}: {e}", output_dir.display()))
        })?;

        let mut exported = Vec::new();
        for name in self.store.list_tables()? {
            if self.store.row_count(&name)? == 0 {
                debug!(table = %name, "Skipping empty table");
                continue;
            }

            let records = self.store.read_table(&name)?;
            let key = self.key_for(&name)?;
            let key_columns = key.columns();
            let path = self.sink.destination_for(output_dir, &name);

            let rows = self
                .sink
                .write_table(&name, &path, key_columns.as_deref(), &records)?;
            info!(table = %name, rows, path = %path.display(), "Exported table");

            exported.push(ExportedTable {
                name,
                rows,
                key: key_columns,
                path,
            });
        }
        Ok(exported)
    }

    fn key_for(&self, table: &str) -> Result<TableKey> {
        if let Some(key) = self.keys.get(table) {
            return Ok(key.clone());
        }
        if let Some(field) = self
            .catalog
            .object(table)
            .and_then(|o| o.primary_key.as_deref())
        {
            return Ok(TableKey::explicit(field));
        }
        let columns = self.store.columns(table)?;
        let fields: Vec<&str> = columns.iter().map(String::as_str).collect();
        Ok(resolve_key(table, &fields))
    }
}

fn dedup(objects: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    objects
        .iter()
        .filter(|o| seen.insert(o.as_str()))
        .cloned()
        .collect()
}

fn failure(object: &str, error: &Error) -> ObjectFailure {
    ObjectFailure {
        object: object.to_string(),
        message: error.to_string(),
    }
}
