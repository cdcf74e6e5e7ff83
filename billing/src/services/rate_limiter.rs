use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use super::cancel::CancelSignal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter wait cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// Token bucket shared by all outbound provider calls of one orchestrator.
///
/// Holds at most `capacity` tokens, refilled continuously at
/// `capacity / interval`. Partial tokens are carried over until they add up
/// to a whole one. The lock is only held to inspect or take tokens, never
/// across a wait, so every waiter observes its own cancel signal.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u64,
    interval: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = u64::from(capacity.max(1));
        Self {
            capacity,
            interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Take one token, waiting for a refill when the bucket is empty.
    /// A cancelled wait consumes nothing.
    pub async fn acquire(&self, signal: &CancelSignal) -> Result<(), RateLimitError> {
        if signal.is_cancelled() {
            return Err(RateLimitError::Cancelled);
        }

        loop {
            let wait = {
                let mut state = tokio::select! {
                    _ = signal.cancelled() => return Err(RateLimitError::Cancelled),
                    state = self.state.lock() => state,
                };
                self.refill(&mut state);
                if state.tokens > 0 {
                    state.tokens -= 1;
                    return Ok(());
                }
                self.until_next_token(&state)
            };

            tokio::select! {
                _ = signal.cancelled() => return Err(RateLimitError::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }

    pub async fn available_tokens(&self) -> u64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    /// Time left until the partially refilled bucket earns a whole token.
    fn until_next_token(&self, state: &BucketState) -> Duration {
        let capacity = u128::from(self.capacity);
        let needed = (self.interval.as_nanos() + capacity - 1) / capacity;
        let elapsed = Instant::now().saturating_duration_since(state.last_refill).as_nanos();
        let remaining = u64::try_from(needed.saturating_sub(elapsed)).unwrap_or(u64::MAX);
        Duration::from_nanos(remaining.max(1))
    }

    fn refill(&self, state: &mut BucketState) {
        let interval_nanos = self.interval.as_nanos();
        if interval_nanos == 0 {
            state.tokens = self.capacity;
            state.last_refill = Instant::now();
            return;
        }

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_nanos();
        let earned = elapsed * u128::from(self.capacity) / interval_nanos;
        if earned > 0 {
            let earned = u64::try_from(earned).unwrap_or(u64::MAX);
            state.tokens = state.tokens.saturating_add(earned).min(self.capacity);
            state.last_refill = now;
        }
    }
}
