//! Retry budget and backoff calculation

use crate::types::BackoffType;
use std::time::Duration;

/// How often and how patiently a transient failure is retried.
///
/// `max_attempts` counts every request including the first one, so a budget
/// of 3 sleeps at most twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed per request
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any computed delay
    pub max_delay: Duration,
    /// Growth of the delay between attempts
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with exponential backoff
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Set the delay cap
    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff growth
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType) -> Self {
        self.backoff_type = backoff_type;
        self
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// An advertised delay from the upstream wins over the computed one;
    /// both are capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, advertised: Option<Duration>) -> Duration {
        if let Some(delay) = advertised {
            return std::cmp::min(delay, self.max_delay);
        }

        let n = attempt.max(1);
        let delay = match self.backoff_type {
            BackoffType::Constant => self.base_delay,
            BackoffType::Linear => self.base_delay.saturating_mul(n),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(n - 1);
                self.base_delay.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_delay)
    }
}
