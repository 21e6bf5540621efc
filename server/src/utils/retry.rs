//! Async retry combinator with a fixed backoff

use std::future::Future;
use std::time::Duration;

/// Bounded retry policy
///
/// Attempts run serially. Sleeping between attempts yields to the runtime,
/// so a retrying caller never stalls unrelated requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before each retry
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: delay,
        }
    }

    /// Run `operation` until it succeeds or attempts are exhausted.
    ///
    /// Returns `Ok((value, attempts))` on success, or `Err((last_error, attempts))`.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<(T, u32), (E, u32)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err((e, attempt));
                    }
                    let delay = self.backoff;
                    tracing::debug!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after failed attempt"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
