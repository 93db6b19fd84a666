//! Exponential backoff for provider calls.
//!
//! Only transient errors (rate limiting, temporary unavailability) are
//! retried. Every other error is returned on the first occurrence.
//! Backoff sleeps observe the cancellation token so a cancelled crawl
//! never waits out a long delay.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::core::provider::{ProviderError, ProviderResult};

/// Backoff parameters for transient provider errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// `base * 2^attempt` capped at `max_delay`, plus up to 10% jitter.
    /// A provider-supplied `retry_after` replaces the computed delay but
    /// is still capped.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }

        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        let jitter_ceiling = delay.as_millis() as u64 / 10;
        if jitter_ceiling == 0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ceiling);
        (delay + Duration::from_millis(jitter)).min(self.max_delay)
    }
}

/// Run `call` until it succeeds, fails permanently, or retries run out.
///
/// `what` names the call in logs.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut call: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => err,
            Err(err) => return Err(err),
        };

        if attempt >= policy.max_retries {
            tracing::warn!("{} failed after {} attempts: {}", what, attempt + 1, err);
            return Err(ProviderError::RetriesExhausted {
                attempts: attempt + 1,
                last: err.to_string(),
            });
        }

        let retry_after = match &err {
            ProviderError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };
        let delay = policy.delay_for(attempt, retry_after);
        tracing::debug!(
            "{} attempt {} failed ({}), retrying in {:?}",
            what,
            attempt + 1,
            err,
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}
