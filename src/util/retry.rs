//! Bounded retry policy and the combinator that runs it.
//!
//! DESIGN
//! ======
//! An operation runs once, then up to `max_retries` more times with a sleep
//! between attempts. Fixed delays serve startup identity checks; exponential
//! delays (doubling, capped) suit reconnect-style loops.

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential { max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay, backoff: Backoff::Fixed }
    }

    #[must_use]
    pub const fn exponential(max_retries: u32, delay: Duration, max: Duration) -> Self {
        Self { max_retries, delay, backoff: Backoff::Exponential { max } }
    }

    /// Sleep before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
                self.delay.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Run `op` under `policy`. `op` receives the zero-based attempt number.
///
/// # Errors
///
/// Returns the error of the last attempt once retries are exhausted.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_retries => {
                tracing::warn!(attempt = attempt + 1, error = %e, "attempt failed; retries exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    error = %e,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
