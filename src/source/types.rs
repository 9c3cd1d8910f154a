//! Record source types

use crate::error::Result;
use crate::types::{JsonObject, Record};
use async_trait::async_trait;

/// Parameters for a single page fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    /// Maximum number of records to return
    pub limit: u32,
    /// Continuation token from the previous page; `None` for the first page
    pub token: Option<String>,
    /// Extra parameters sent with the request (e.g. a parent id)
    pub params: JsonObject,
}

impl PageRequest {
    /// First-page request with the given limit
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Set the continuation token
    #[must_use]
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set the extra parameters
    #[must_use]
    pub fn params(mut self, params: JsonObject) -> Self {
        self.params = params;
        self
    }
}

/// One page of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records on this page (possibly empty)
    pub records: Vec<Record>,
    /// Token for the next page; `None` means this was the last page
    pub next_token: Option<String>,
}

impl Page {
    /// Create a page
    pub fn new(records: Vec<Record>, next_token: Option<String>) -> Self {
        Self {
            records,
            next_token,
        }
    }

    /// Final page with the given records
    pub fn last(records: Vec<Record>) -> Self {
        Self::new(records, None)
    }
}

/// Yields pages of records for a named endpoint.
///
/// Implementations must report rate limiting, timeouts, missing resources and
/// rejected requests as distinct [`crate::error::Error`] variants so the
/// fetcher can decide what to retry.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch a single page
    async fn fetch(&self, endpoint: &str, request: &PageRequest) -> Result<Page>;
}
