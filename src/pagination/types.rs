//! Pagination types

use crate::source::Page;
use std::collections::HashSet;
use tracing::warn;

/// Largest page the upstream accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available behind this token
    Continue {
        /// Token to send with the next request
        token: String,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Token for the next request (`None` before the first page)
    pub token: Option<String>,
    /// Pages received so far
    pub pages: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
    seen_tokens: HashSet<String>,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Account for a received page and decide whether to continue.
    ///
    /// Only the continuation token decides; an empty page that carries a token
    /// still continues. A token that was already followed ends pagination so a
    /// misbehaving upstream cannot loop forever.
    pub fn advance(&mut self, endpoint: &str, page: &Page) -> NextPage {
        self.pages += 1;
        self.total_fetched += page.records.len() as u64;

        match &page.next_token {
            None => {
                self.mark_done();
                NextPage::Done
            }
            Some(token) if !self.seen_tokens.insert(token.clone()) => {
                warn!(
                    endpoint,
                    token = %token,
                    pages = self.pages,
                    "Upstream repeated a continuation token, stopping pagination"
                );
                self.mark_done();
                NextPage::Done
            }
            Some(token) => {
                self.token = Some(token.clone());
                NextPage::Continue {
                    token: token.clone(),
                }
            }
        }
    }
}
