//! Dependent object resolution
//!
//! Some objects can only be fetched per parent: the ids are harvested from a
//! table staged earlier in the run, then one paginated fetch is issued per
//! distinct id.
//!
//! # Overview
//!
//! - [`DependentJob`] names the source table, its key, the endpoint and the
//!   request parameter carrying the id
//! - [`DependentResolver`] collects the ids and merges the per-id results,
//!   tagging each record with `_source_{key}`
//! - A failure for one id is logged and skipped

mod resolver;
mod types;

pub use resolver::DependentResolver;
pub use types::{source_tag, DependentJob, ParentIds, Resolution, ResolveOutcome};
