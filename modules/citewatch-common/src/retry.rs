use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Explicit retry policy for transient remote failures.
///
/// Delay before retry `n` (0-based) is `base_delay * multiplier^n` plus up to `jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 3,
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * self.multiplier.saturating_pow(attempt)
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or attempts run out.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut op: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < attempts && is_retryable(&e) => {
                    let jitter_ms = self.jitter.as_millis() as u64;
                    let jitter = if jitter_ms == 0 {
                        Duration::ZERO
                    } else {
                        Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
                    };
                    warn!(label, attempt = attempt + 1, error = %e, "Transient failure, retrying");
                    tokio::time::sleep(self.backoff(attempt) + jitter).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
