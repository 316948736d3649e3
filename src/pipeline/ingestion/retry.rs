use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Ceiling on a server-provided wait hint unless configured otherwise.
pub const DEFAULT_MAX_HINT: Duration = Duration::from_secs(15 * 60);

/// Bounded exponential backoff shared by every retried call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Longest server hint honored; larger hints are clamped
    pub max_hint: Duration,
    /// Which failures get another attempt
    pub retry_if: fn(&FetchError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
            max_delay,
            max_hint: DEFAULT_MAX_HINT,
            retry_if: FetchError::is_retryable,
        }
    }

    pub fn with_max_hint(mut self, max_hint: Duration) -> Self {
        self.max_hint = max_hint;
        self
    }

    /// Backoff before retry number `retry` (1-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_millis(capped as u64)
        } else {
            self.max_delay
        }
    }

    /// Delay before the next attempt: the server hint (up to `max_hint`) when
    /// present, else backoff.
    pub fn delay_for(&self, retry: u32, err: &FetchError) -> Duration {
        match err.retry_hint() {
            Some(hint) => hint.min(self.max_hint),
            None => self.backoff(retry),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent (then `Exhausted`).
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if (self.retry_if)(&err) => {
                    if attempt >= self.max_attempts {
                        warn!(target: "match_stats::retry", %what, attempts = attempt, error = %err, "retries exhausted");
                        return Err(FetchError::Exhausted {
                            attempts: attempt,
                            last: err.to_string(),
                        });
                    }
                    let delay = self.delay_for(attempt, &err);
                    crate::metrics::fetch::retry_scheduled(err.kind());
                    debug!(%what, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(6, Duration::from_secs(1), 2.0, Duration::from_secs(60))
    }
}
