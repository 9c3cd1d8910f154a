//! Engine types
//!
//! Run settings, the timing profile and the run summary.

use crate::http::RetryPolicy;
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::types::JsonValue;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Profile
// ============================================================================

/// Accumulated time for one profile key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// `fetch:<endpoint>`, `dependent:<object>` or `stage:<name>`
    pub key: String,
    /// Sum of all recorded durations
    pub total: Duration,
    /// Number of recordings
    pub calls: u32,
}

/// Timing breakdown of one run.
///
/// Owned by the run and handed `&mut` to each stage. Entries keep the order
/// in which their key was first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    entries: Vec<ProfileEntry>,
}

impl Profile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` to `key`
    pub fn record(&mut self, key: impl Into<String>, elapsed: Duration) {
        let key = key.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.total += elapsed;
                entry.calls += 1;
            }
            None => self.entries.push(ProfileEntry {
                key,
                total: elapsed,
                calls: 1,
            }),
        }
    }

    /// Entry for `key`
    pub fn get(&self, key: &str) -> Option<&ProfileEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Fold `other` into this profile
    pub fn merge(&mut self, other: Profile) {
        for entry in other.entries {
            match self.entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => {
                    existing.total += entry.total;
                    existing.calls += entry.calls;
                }
                None => self.entries.push(entry),
            }
        }
    }

    /// Sum over keys starting with `prefix`
    pub fn total_for(&self, prefix: &str) -> Duration {
        self.entries
            .iter()
            .filter(|e| e.key.starts_with(prefix))
            .map(|e| e.total)
            .sum()
    }

    /// Sum over every key.
    ///
    /// Categories nest (a dependent resolution contains its fetches), so this
    /// is an upper bound on wall time rather than equal to it.
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|e| e.total).sum()
    }

    /// Entries in first-recorded order
    pub fn iter(&self) -> impl Iterator<Item = &ProfileEntry> {
        self.entries.iter()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Knobs of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Records per page
    pub page_size: u32,
    /// Run the dependent phase
    pub include_dependent: bool,
    /// Directory receiving exported tables
    pub output_dir: PathBuf,
    /// Retry budget for every page fetch
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            include_dependent: true,
            output_dir: PathBuf::from("out/tables"),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineSettings {
    /// Create settings with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enable or disable the dependent phase
    #[must_use]
    pub fn with_dependent(mut self, include: bool) -> Self {
        self.include_dependent = include;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// ============================================================================
// Summary
// ============================================================================

/// A table written by the export phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTable {
    /// Table name
    pub name: String,
    /// Rows written
    pub rows: usize,
    /// Key columns, `None` when the table has no key
    pub key: Option<Vec<String>>,
    /// File written
    pub path: PathBuf,
}

/// An object type that could not be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    /// Object type
    pub object: String,
    /// Rendered error
    pub message: String,
}

/// A parent id whose dependent fetch failed
#[derive(Debug, Clone, PartialEq)]
pub struct IdFailure {
    /// Parent id as read from the source table
    pub id: JsonValue,
    /// Rendered error
    pub message: String,
}

/// A dependent object staged from only some of its parent ids
#[derive(Debug, Clone, PartialEq)]
pub struct PartialFailure {
    /// Dependent object type
    pub object: String,
    /// Distinct parent ids that were fetched
    pub attempted: usize,
    /// Ids whose fetch failed
    pub failed: Vec<IdFailure>,
}

/// Terminal state of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Record count per object type: requested primaries first, then dependents
    pub object_counts: Vec<(String, usize)>,
    /// Tables written by the export phase
    pub tables: Vec<ExportedTable>,
    /// Object types that failed and were counted as zero
    pub failures: Vec<ObjectFailure>,
    /// Dependent object types missing the records of some parent ids
    pub partial: Vec<PartialFailure>,
    /// Timing breakdown
    pub profile: Profile,
}

impl RunSummary {
    /// Record count of `object`
    pub fn count(&self, object: &str) -> Option<usize> {
        self.object_counts
            .iter()
            .find(|(name, _)| name == object)
            .map(|(_, n)| *n)
    }

    /// Sum of all object counts
    pub fn total_records(&self) -> usize {
        self.object_counts.iter().map(|(_, n)| n).sum()
    }

    /// Check if `object` failed
    pub fn failed(&self, object: &str) -> bool {
        self.failures.iter().any(|f| f.object == object)
    }

    /// Partial failure of dependent `object`
    pub fn partial_for(&self, object: &str) -> Option<&PartialFailure> {
        self.partial.iter().find(|p| p.object == object)
    }

    /// Exported table named `name`
    pub fn table(&self, name: &str) -> Option<&ExportedTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}
