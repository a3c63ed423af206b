//! Upstream pacing configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_jitter_ratio() -> f64 {
    0.2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Minimum spacing between calls with no recent errors, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Uniform jitter applied to backoff delays (0.2 = ±20%).
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

impl RateLimitConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::invalid(
                "rate_limit.max_delay_ms",
                format!(
                    "{} is below base_delay_ms {}",
                    self.max_delay_ms, self.base_delay_ms
                ),
            ));
        }
        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::invalid(
                "rate_limit.jitter_ratio",
                format!("{} is outside [0.0, 1.0)", self.jitter_ratio),
            ));
        }
        Ok(())
    }
}
