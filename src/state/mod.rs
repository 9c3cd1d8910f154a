//! Run state persistence
//!
//! After every pipeline run the per-object record counts are written to a
//! small JSON document so the next run (or an operator) can see what the
//! previous one produced:
//!
//! ```json
//! {"lastRun": "2024-05-01T08:00:00Z", "objectCounts": {"user": 12}}
//! ```

mod manager;
mod types;

pub use manager::StateManager;
pub use types::RunState;
