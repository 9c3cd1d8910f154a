//! Record sources
//!
//! A [`RecordSource`] yields one page of semi-structured records per call.
//! The pipeline core only ever talks to this trait; [`HttpRecordSource`] is
//! the implementation backed by the Fidoo REST API.

mod http;
mod types;

pub use http::{extract_next_token, extract_records, HttpRecordSource, DEFAULT_BASE_URL};
pub use types::{Page, PageRequest, RecordSource};

#[cfg(test)]
pub(crate) mod scripted;

#[cfg(test)]
mod tests;
