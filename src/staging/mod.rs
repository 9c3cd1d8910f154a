//! Staging store
//!
//! Holds the normalized tables of one pipeline run in a queryable store.
//! The pipeline owns its store exclusively for the duration of a run.

mod duckdb_store;
mod types;

pub use duckdb_store::DuckDbStore;
pub use types::{ColumnType, StagingStore};

#[cfg(test)]
mod tests;
