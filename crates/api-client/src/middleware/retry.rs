//! Retry with linear backoff

use crate::transport::{ApiRequest, HttpMethod, RawResponse, Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `n * base_delay`
    pub base_delay: Duration,
    /// Whether POST requests are retried too
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            retry_non_idempotent: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Default::default() }
    }

    /// A policy that sends every request exactly once
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Set the backoff unit
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Enable or disable retrying POST requests
    pub fn with_retry_non_idempotent(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }

    /// Wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Attempt budget for a request with this method
    pub fn attempts_for(&self, method: HttpMethod) -> u32 {
        if method.is_idempotent() || self.retry_non_idempotent {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// Replays requests that failed with a network error or a 5xx response
///
/// Attempts are strictly sequential. When the budget is exhausted the last
/// failure is returned unchanged; any other outcome is returned at once.
pub struct RetryLayer<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryLayer<T> {
    /// Wrap `inner`
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

fn should_retry(result: &Result<RawResponse, TransportError>) -> bool {
    match result {
        Ok(response) => response.is_server_error(),
        Err(e) => e.is_network(),
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryLayer<T> {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let max_attempts = self.policy.attempts_for(request.method);
        let mut attempt = 1;

        loop {
            let result = self.inner.send(request.clone()).await;

            if !should_retry(&result) || attempt >= max_attempts {
                return result;
            }

            let delay = self.policy.delay_for(attempt);
            match &result {
                Ok(response) => tracing::warn!(
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    attempt,
                    "server error, retrying in {:?}",
                    delay
                ),
                Err(e) => tracing::warn!(
                    method = request.method.as_str(),
                    path = %request.path,
                    attempt,
                    "{}, retrying in {:?}",
                    e,
                    delay
                ),
            }

            sleep(delay).await;
            attempt += 1;
        }
    }
}
