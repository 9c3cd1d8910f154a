//! Paginated fetcher

use super::types::{NextPage, PaginationState, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::http::RetryPolicy;
use crate::source::{Page, PageRequest, RecordSource};
use crate::types::{JsonObject, Record};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

/// Lazy sequence of record batches for one endpoint
pub type BatchStream<'a> = BoxStream<'a, Result<Vec<Record>>>;

/// Fetches every page of an endpoint from a record source
#[derive(Debug)]
pub struct PaginatedFetcher<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: RecordSource + ?Sized> PaginatedFetcher<'a, S> {
    /// Create a fetcher over `source`
    pub fn new(source: &'a S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Retry policy applied to every page request
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Stream all record batches of `endpoint`.
    ///
    /// The page size is checked before any request is made. Nothing is fetched
    /// until the stream is polled, and dropping the stream stops fetching.
    /// Empty pages are not yielded.
    pub fn fetch_all(
        &self,
        endpoint: &str,
        page_size: u32,
        params: JsonObject,
    ) -> Result<BatchStream<'a>> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page size {page_size} for '{endpoint}' must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let cursor = Cursor {
            endpoint: endpoint.to_string(),
            page_size,
            params,
            policy: self.policy.clone(),
            state: PaginationState::new(),
        };
        let source = self.source;

        Ok(stream::try_unfold(cursor, move |cursor| next_batch(source, cursor)).boxed())
    }

    /// Fetch every record of `endpoint` into memory
    pub async fn collect_all(
        &self,
        endpoint: &str,
        page_size: u32,
        params: JsonObject,
    ) -> Result<Vec<Record>> {
        self.fetch_all(endpoint, page_size, params)?
            .try_concat()
            .await
    }
}

struct Cursor {
    endpoint: String,
    page_size: u32,
    params: JsonObject,
    policy: RetryPolicy,
    state: PaginationState,
}

async fn next_batch<S: RecordSource + ?Sized>(
    source: &S,
    mut cursor: Cursor,
) -> Result<Option<(Vec<Record>, Cursor)>> {
    loop {
        if cursor.state.done {
            return Ok(None);
        }

        let request = PageRequest::new(cursor.page_size)
            .token(cursor.state.token.clone())
            .params(cursor.params.clone());
        let page = fetch_page(source, &cursor.endpoint, &request, &cursor.policy).await?;

        let next = cursor.state.advance(&cursor.endpoint, &page);
        debug!(
            endpoint = %cursor.endpoint,
            page = cursor.state.pages,
            records = page.records.len(),
            done = next.is_done(),
            "Received page"
        );

        if !page.records.is_empty() {
            return Ok(Some((page.records, cursor)));
        }
        if next == NextPage::Done {
            return Ok(None);
        }
    }
}

/// Fetch one page, retrying transient failures according to `policy`.
///
/// Non-retryable failures return immediately. When the budget runs out the
/// last failure is wrapped in [`Error::RetriesExhausted`].
pub async fn fetch_page<S: RecordSource + ?Sized>(
    source: &S,
    endpoint: &str,
    request: &PageRequest,
    policy: &RetryPolicy,
) -> Result<Page> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match source.fetch(endpoint, request).await {
            Ok(page) => return Ok(page),
            Err(e) if e.is_retryable() => {
                if !policy.should_retry(attempt) {
                    return Err(Error::RetriesExhausted {
                        endpoint: endpoint.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                let delay = policy.delay_for(attempt, e.retry_after());
                warn!(
                    endpoint,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
