//! JSON normalization
//!
//! Splits nested records into a forest of flat relational tables. Every
//! nested object or array becomes a satellite table named
//! `{parent}__{field}` whose rows point back at their parent through
//! `parent_id` (plus `idx` for array elements).
//!
//! # Example
//!
//! ```ignore
//! let out = normalize("user", records, None)?;
//! assert_eq!(out.table.name, "user");
//! for satellite in &out.satellites {
//!     println!("{} ({} rows)", satellite.name, satellite.len());
//! }
//! ```

mod keys;
mod normalizer;

pub use keys::{
    infer_primary_key, is_satellite, resolve_key, satellite_key, satellite_name, singularize,
    KeyRule, TableKey, INDEX, PARENT_ID, SATELLITE_SEPARATOR, VALUE,
};
pub use normalizer::{
    column_names, normalize, scalar_column_names, Normalized, SatelliteOrigin, Table,
};
