//! Execution engine module
//!
//! Orchestrates a pipeline run over the record source, the normalizer, the
//! staging store and the tabular sink.
//!
//! # Overview
//!
//! A run enters three phases in order:
//! 1. **Primary**: fetch, normalize and stage every requested object type
//! 2. **Dependent**: resolve objects keyed by ids from a staged parent table
//! 3. **Export**: write every non-empty staged table through the sink
//!
//! A failure in one object type never stops the others; it shows up as a
//! zero count in the [`RunSummary`]. Timing is collected in an explicit
//! [`Profile`] returned with the summary.

mod pipeline;
mod types;

pub use pipeline::Pipeline;
pub use types::{
    ExportedTable, IdFailure, ObjectFailure, PartialFailure, PipelineSettings, Profile,
    ProfileEntry, RunSummary,
};
