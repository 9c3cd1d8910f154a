//! Pagination module
//!
//! Cursor-token pagination over a [`crate::source::RecordSource`], with
//! bounded retry of transient failures.
//!
//! # Example
//!
//! ```ignore
//! let fetcher = PaginatedFetcher::new(&source, RetryPolicy::default());
//! let mut batches = fetcher.fetch_all("user/get-users", 100, JsonObject::new())?;
//! while let Some(batch) = batches.try_next().await? {
//!     // ...
//! }
//! ```

mod fetcher;
mod types;

pub use fetcher::{fetch_page, BatchStream, PaginatedFetcher};
pub use types::{NextPage, PaginationState, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
