use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::error::ApiError;

/// Longest `Retry-After` we are willing to honor inside a run.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Bounded exponential backoff with jitter, plus a per-call timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails permanently, or the attempt cap is hit.
    ///
    /// A call exceeding `call_timeout` counts as a transient failure. The
    /// last error is returned once attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match timeout(self.call_timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => ApiError::Timeout(self.call_timeout),
            };

            if !err.is_transient() || attempt >= attempts {
                return Err(err);
            }

            let delay = match err.retry_after() {
                Some(hint) if hint <= MAX_RETRY_AFTER => hint,
                _ => self.backoff(attempt),
            };
            warn!(
                operation = what,
                attempt,
                max_attempts = attempts,
                error = %err,
                "transient failure, retrying in {:?}",
                delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let millis = capped.as_millis() as u64;
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(millis / 2..=millis))
    }
}
