//! Retry policy.
//!
//! Bounded exponential backoff: retry `n` waits
//! `min(base * 2^(n-1), max)`, multiplied for rate-limited failures (or the
//! server's retry-after when that is longer), plus uniform jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::SenderSettings;
use crate::domain::{SendError, SendErrorKind};
use crate::shared::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    rate_limit_multiplier: u32,
    jitter_ms: u64,
}

impl RetryPolicy {
    pub fn new(settings: &SenderSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            rate_limit_multiplier: settings.rate_limit_multiplier,
            jitter_ms: settings.jitter_ms,
        }
    }

    /// Disable jitter so delays are exact.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_ms = 0;
        self
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `retry` (1-based) after `error`.
    pub fn delay_for(&self, retry: u32, error: &SendError) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let mut delay = self
            .base_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);

        if error.kind() == SendErrorKind::RateLimited {
            delay = delay.saturating_mul(self.rate_limit_multiplier);
            if let Some(retry_after) = error.retry_after() {
                delay = delay.max(retry_after);
            }
        }

        if self.jitter_ms > 0 {
            let jitter = rand::rng().random_range(0..=self.jitter_ms);
            delay = delay.saturating_add(Duration::from_millis(jitter));
        }
        delay
    }

    /// Sleep before retry number `retry`, waking early if the send is
    /// cancelled.
    pub async fn back_off(
        &self,
        retry: u32,
        error: &SendError,
        cancel: &CancellationToken,
    ) -> Result<(), SendError> {
        let delay = self.delay_for(retry, error);
        tracing::debug!(retry, ?delay, kind = %error.kind(), "Backing off before retry");

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => Err(SendError::cancelled()),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&SenderSettings::default())
    }
}
