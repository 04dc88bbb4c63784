//! Read retry policy.
//!
//! Reads retry a small fixed number of times with exponential back-off.
//! Client errors (4xx) never retry since repeating them cannot succeed, and
//! writes never go through this policy at all.

use std::time::Duration;

use crate::config::QueryConfig;
use crate::net::ApiError;

pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &QueryConfig) -> Self {
        Self { max_retries: config.max_retries, base_delay: config.retry_base_delay, max_delay: MAX_RETRY_DELAY }
    }

    /// Whether to retry after `retries_done` retries have already failed with `err`.
    #[must_use]
    pub fn should_retry(&self, retries_done: u32, err: &ApiError) -> bool {
        retries_done < self.max_retries && !err.is_client_error() && err.retryable()
    }

    /// Back-off before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1_u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
