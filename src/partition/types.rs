//! Dependent resolution types

use crate::error::Error;
use crate::types::{JsonValue, Record};
use serde::{Deserialize, Serialize};

/// How to fetch an object whose requests need a parent id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentJob {
    /// Object type (and staged table) name
    pub name: String,
    /// Object whose staged table supplies the ids
    pub source: String,
    /// Key field of the source table; inferred when absent
    #[serde(default)]
    pub source_key: Option<String>,
    /// Endpoint fetched once per id
    pub endpoint: String,
    /// Request parameter that carries the id
    pub param: String,
}

/// Distinct ids harvested from a staged source table
#[derive(Debug, Clone, PartialEq)]
pub struct ParentIds {
    /// Field the ids were read from
    pub key: String,
    /// Distinct non-null values in first-seen order
    pub values: Vec<JsonValue>,
}

/// Merged result of a dependent fetch
#[derive(Debug, Default)]
pub struct Resolution {
    /// Records from every successful per-id fetch, tagged with their parent id
    pub records: Vec<Record>,
    /// Number of distinct ids that were fetched
    pub ids: usize,
    /// Ids whose fetch failed, with the error
    pub failures: Vec<(JsonValue, Error)>,
}

impl Resolution {
    /// Check if any per-id fetch failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of resolving one dependent job
#[derive(Debug)]
pub enum ResolveOutcome {
    /// The source table was not staged in this run
    SourceMissing,
    /// Ids were collected and fetched
    Resolved(Resolution),
}

/// Column added to every dependent record, naming the parent id it came from
pub fn source_tag(source_key: &str) -> String {
    format!("_source_{source_key}")
}
