// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Fidoo Extractor
//!
//! Extracts every object type of the Fidoo expense-management REST API into
//! flat, relational tables.
//!
//! ## Features
//!
//! - **Token pagination**: follows `nextOffsetToken` with retry and rate limiting
//! - **Normalization**: nested arrays become `parent__child` satellite tables
//! - **Dependent objects**: fans out over staged parent ids
//! - **DuckDB staging**: tables are staged before export
//! - **CSV and Parquet output**: CSV files carry a load manifest
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fidoo_extractor::catalog::Catalog;
//! use fidoo_extractor::engine::Pipeline;
//! use fidoo_extractor::output::CsvSink;
//! use fidoo_extractor::source::HttpRecordSource;
//! use fidoo_extractor::staging::DuckDbStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> fidoo_extractor::Result<()> {
//!     let source = HttpRecordSource::new(
//!         "https://api.fidoo.com/v2",
//!         "my-api-key",
//!         Duration::from_secs(30),
//!         Some(5),
//!     )?;
//!
//!     let mut pipeline = Pipeline::new(
//!         Arc::new(source),
//!         Box::new(DuckDbStore::in_memory()?),
//!         Box::new(CsvSink::default()),
//!         Catalog::builtin()?,
//!     );
//!
//!     let objects = vec!["user".to_string(), "expense".to_string()];
//!     let summary = pipeline.run(&objects).await?;
//!     println!("{} records", summary.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Pipeline                              │
//! │  phase 1: primary objects  phase 2: dependents  phase 3: export  │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌──────────┬────────────┬───────┴──────┬───────────┬──────────────┐
//! │  Source  │ Pagination │  Normalize   │  Staging  │    Output    │
//! ├──────────┼────────────┼──────────────┼───────────┼──────────────┤
//! │ API key  │ Token      │ Satellites   │ DuckDB    │ CSV+manifest │
//! │ Retry    │ Retry      │ Key infer    │           │ Parquet      │
//! │ Rate lim │            │              │           │              │
//! └──────────┴────────────┴──────────────┴───────────┴──────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// API key authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Record sources (HTTP API, scripted test doubles)
pub mod source;

/// Token pagination
pub mod pagination;

/// Nested record flattening and key inference
pub mod normalize;

/// Staging store
pub mod staging;

/// Dependent object resolution
pub mod partition;

/// CSV/Parquet output
pub mod output;

/// Last-run state
pub mod state;

/// Object catalog
pub mod catalog;

/// Pipeline configuration
pub mod config;

/// Extraction pipeline
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use catalog::Catalog;
pub use config::PipelineConfig;
pub use engine::{Pipeline, RunSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
