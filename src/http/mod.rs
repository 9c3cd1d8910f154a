//! HTTP transport module
//!
//! Provides the HTTP client, rate limiting, and the retry policy used by the
//! paginated fetcher.
//!
//! # Features
//!
//! - **Error Classification**: Every non-success status maps onto a distinct error kind
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Policy**: Constant, linear, and exponential backoff
//! - **Authentication**: Integration with auth module
//!
//! The client performs exactly one attempt per call. Retrying is the caller's
//! decision, driven by [`RetryPolicy`] and [`crate::error::Error::is_retryable`].

mod client;
mod rate_limit;
mod retry;

pub use client::{classify_status, HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::RetryPolicy;

#[cfg(test)]
mod tests;
