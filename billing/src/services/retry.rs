use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use super::cancel::CancelSignal;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Exponential,
    Linear,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("operation cancelled")]
    Cancelled,
    #[error("failed after {attempts} attempt(s): {error}")]
    Failed { attempts: u32, error: E },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff: Backoff::Exponential,
        }
    }

    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    /// Sleep taken after the failed attempt with 0-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential => self.base_delay.saturating_mul(2u32.saturating_pow(attempt)),
            Backoff::Linear => self.base_delay.saturating_mul(attempt.saturating_add(1)),
        }
    }

    /// Run `operation` until it succeeds, returns a non-retryable error or
    /// the attempts run out. Cancellation stops it before the next attempt
    /// and interrupts both an in-flight attempt and a backoff sleep.
    pub async fn run<T, E, F, Fut>(&self, signal: &CancelSignal, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Retryable,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if signal.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = signal.cancelled() => return Err(RetryError::Cancelled),
                outcome = operation(attempt) => outcome,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let attempts = attempt + 1;
            if attempts >= max_attempts || !error.is_retryable() {
                return Err(RetryError::Failed { attempts, error });
            }

            let delay = self.delay_for(attempt);
            tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Retrying after failure");
            tokio::select! {
                _ = signal.cancelled() => return Err(RetryError::Cancelled),
                _ = sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
