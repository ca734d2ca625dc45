//! Status-code-based retry for the initial HTTP attempt
//!
//! Retries happen only before any bytes of a streaming body have been
//! consumed; partial consumption cannot be safely replayed, so nothing at
//! the decode layer ever retries.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use prism_config::RetryConfig;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;

/// Executes an HTTP attempt with fixed-interval retry
///
/// The interval is deliberately fixed rather than exponential: upstream
/// 429/5xx bursts are typically transient and short.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    enabled: bool,
    max_attempts: u32,
    interval: Duration,
    retryable: HashSet<u16>,
}

impl RetryExecutor {
    /// Build an executor from retry configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts.max(1),
            interval: Duration::from_millis(config.interval_ms),
            retryable: config.retryable_status_codes(),
        }
    }

    /// Run `attempt` up to `max_attempts` times (including the first)
    ///
    /// Only retryable errors are attempted again; the last error is
    /// surfaced unchanged when attempts are exhausted. Cancellation aborts
    /// the inter-attempt wait immediately.
    pub async fn execute<F, Fut, T>(&self, cancel: &CancellationToken, mut attempt: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = if self.enabled { self.max_attempts } else { 1 };
        let mut last_error = None;

        for n in 1..=attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !self.enabled || !error.is_retryable(&self.retryable) {
                        return Err(error);
                    }
                    if n < attempts {
                        tracing::warn!(
                            attempt = n,
                            max_attempts = attempts,
                            error = %error,
                            "attempt failed, retrying after interval"
                        );
                    }
                    last_error = Some(error);
                }
            }

            if n < attempts {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Transport("no attempt was made".to_owned())))
    }
}
