//! Backoff policy for the one request type that retries: image copies.
//!
//! Listing, detail and search requests are single-attempt; the pipeline skips
//! the affected record instead.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

impl ScraperError {
    /// Timeouts, dropped connections, 429 and 5xx. A parse failure or a 404
    /// would fail identically on the next attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// Extra attempts after the first.
    pub retries: u32,
    pub base: Duration,
    pub ceiling: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(retries: u32, base: Duration) -> Self {
        Self {
            retries,
            base,
            ceiling: Duration::from_secs(60),
        }
    }

    /// Doubling delay before retry number `retry` (1-based), clamped to the
    /// ceiling, then jittered into 75%..125%.
    fn delay(&self, retry: u32) -> Duration {
        let doubling = 1u32 << retry.saturating_sub(1).min(10);
        let nominal = self.base.saturating_mul(doubling).min(self.ceiling);
        nominal.mul_f64(rand::random_range(0.75..1.25))
    }

    /// Drives `attempt` until it succeeds, fails with a non-transient error,
    /// or runs out of retries.
    ///
    /// # Errors
    ///
    /// The error of the last attempt made.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut retry = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry == self.retries || !err.is_transient() {
                return Err(err);
            }
            retry += 1;
            let wait = self.delay(retry);
            tracing::warn!(
                retry,
                of = self.retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient fetch failure"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
