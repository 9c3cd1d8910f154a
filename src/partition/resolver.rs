//! Dependent resolver

use super::types::{source_tag, DependentJob, ParentIds, Resolution, ResolveOutcome};
use crate::engine::Profile;
use crate::error::{Error, Result};
use crate::normalize::{infer_primary_key, TableKey};
use crate::pagination::PaginatedFetcher;
use crate::source::RecordSource;
use crate::staging::StagingStore;
use crate::types::JsonObject;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fetches dependent objects once per parent id
pub struct DependentResolver<'a, S: RecordSource + ?Sized> {
    fetcher: PaginatedFetcher<'a, S>,
    page_size: u32,
}

impl<'a, S: RecordSource + ?Sized> DependentResolver<'a, S> {
    /// Create a resolver fetching with `fetcher`
    pub fn new(fetcher: PaginatedFetcher<'a, S>, page_size: u32) -> Self {
        Self { fetcher, page_size }
    }

    /// Collect the distinct parent ids for `job`.
    ///
    /// Returns `None` when the source table is not staged.
    pub fn parent_ids(
        &self,
        job: &DependentJob,
        store: &dyn StagingStore,
    ) -> Result<Option<ParentIds>> {
        if !store.has_table(&job.source)? {
            return Ok(None);
        }

        let columns = store.columns(&job.source)?;
        let key = match &job.source_key {
            Some(key) => key.clone(),
            None => {
                let fields: Vec<&str> = columns.iter().map(String::as_str).collect();
                match infer_primary_key(&job.source, &fields) {
                    TableKey::Primary { field, .. } => field,
                    _ => {
                        return Err(Error::dependent(
                            &job.name,
                            format!("no key could be inferred for source '{}'", job.source),
                        ))
                    }
                }
            }
        };

        if !columns.contains(&key) {
            return Err(Error::dependent(
                &job.name,
                format!("source '{}' has no field '{key}'", job.source),
            ));
        }

        let values = store.distinct_values(&job.source, &key)?;
        debug!(
            object = %job.name,
            source = %job.source,
            key = %key,
            ids = values.len(),
            "Collected parent ids"
        );
        Ok(Some(ParentIds { key, values }))
    }

    /// Fetch `job.endpoint` once per id and merge the results.
    ///
    /// A failed id is logged and recorded in [`Resolution::failures`]; a
    /// not-found id contributes no records.
    pub async fn fetch_for_ids(
        &self,
        job: &DependentJob,
        ids: &ParentIds,
        profile: &mut Profile,
    ) -> Resolution {
        let tag = source_tag(&ids.key);
        let mut resolution = Resolution {
            ids: ids.values.len(),
            ..Resolution::default()
        };

        for id in &ids.values {
            let mut params = JsonObject::new();
            params.insert(job.param.clone(), id.clone());

            let started = Instant::now();
            let result = self
                .fetcher
                .collect_all(&job.endpoint, self.page_size, params)
                .await;
            profile.record(format!("fetch:{}", job.endpoint), started.elapsed());

            match result {
                Ok(records) => {
                    resolution
                        .records
                        .extend(records.into_iter().map(|mut record| {
                            record.insert(tag.clone(), id.clone());
                            record
                        }));
                }
                Err(e) if e.is_not_found() => {
                    debug!(object = %job.name, id = %id, "No records for parent id");
                }
                Err(e) => {
                    warn!(
                        object = %job.name,
                        endpoint = %job.endpoint,
                        id = %id,
                        error = %e,
                        "Dependent fetch failed for parent id, skipping"
                    );
                    resolution.failures.push((id.clone(), e));
                }
            }
        }

        info!(
            object = %job.name,
            ids = resolution.ids,
            records = resolution.records.len(),
            failed = resolution.failures.len(),
            "Resolved dependent object"
        );
        resolution
    }

    /// Collect ids from `store` and fetch every one of them
    pub async fn resolve(
        &self,
        job: &DependentJob,
        store: &dyn StagingStore,
        profile: &mut Profile,
    ) -> Result<ResolveOutcome> {
        let Some(ids) = self.parent_ids(job, store)? else {
            return Ok(ResolveOutcome::SourceMissing);
        };
        Ok(ResolveOutcome::Resolved(
            self.fetch_for_ids(job, &ids, profile).await,
        ))
    }
}
