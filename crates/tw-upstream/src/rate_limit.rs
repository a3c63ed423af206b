//! Call pacing with exponential backoff.
//!
//! With no recent failures calls are spaced by `base_delay`. Each failure
//! doubles the spacing (`base * 2^(errors-1)`), capped at `max_delay`, with
//! uniform jitter. Throttling responses count as two failures.
//!
//! The limiter is single-lane: every method takes `&mut self`. Callers that
//! share one limiter wrap it in a `tokio::sync::Mutex`.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tw_config::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    base_delay: Duration,
    max_delay: Duration,
    jitter_ratio: f64,
    consecutive_errors: u32,
    last_call: Option<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration, jitter_ratio: f64) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter_ratio: jitter_ratio.clamp(0.0, 0.99),
            consecutive_errors: 0,
            last_call: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.jitter_ratio,
        )
    }

    #[must_use]
    pub const fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Spacing before the next call, without jitter.
    #[must_use]
    pub fn nominal_delay(&self) -> Duration {
        if self.consecutive_errors == 0 {
            return self.base_delay;
        }
        let exponent = (self.consecutive_errors - 1).min(31);
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Spacing before the next call, jittered while backing off and never
    /// above `max_delay`.
    fn jittered_delay(&self) -> Duration {
        let nominal = self.nominal_delay();
        if self.consecutive_errors == 0 || self.jitter_ratio == 0.0 {
            return nominal;
        }
        let factor = rand::rng().random_range(1.0 - self.jitter_ratio..=1.0 + self.jitter_ratio);
        nominal.mul_f64(factor).min(self.max_delay)
    }

    /// Sleep until the next call may be issued, then claim the slot.
    pub async fn wait(&mut self) {
        let delay = self.jittered_delay();
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                tracing::debug!(
                    remaining_ms = remaining.as_millis(),
                    consecutive_errors = self.consecutive_errors,
                    "rate limiter sleeping"
                );
                tokio::time::sleep(remaining).await;
            }
        }
        self.last_call = Some(Instant::now());
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    pub fn record_error(&mut self, is_throttled: bool) {
        let step = if is_throttled { 2 } else { 1 };
        self.consecutive_errors = self.consecutive_errors.saturating_add(step);
        tracing::debug!(
            consecutive_errors = self.consecutive_errors,
            is_throttled,
            next_delay_ms = self.nominal_delay().as_millis(),
            "upstream call failed"
        );
    }
}
