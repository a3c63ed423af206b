//! Upstream trend feed configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_region() -> String {
    "US".to_string()
}

const fn default_cache_ttl_minutes() -> u32 {
    120
}

const fn default_min_trend_score() -> u32 {
    50
}

const fn default_max_trends() -> u32 {
    20
}

const fn default_fetch_attempts() -> u32 {
    3
}

const fn default_timeout_secs() -> u64 {
    15
}

const fn default_watch_interval_minutes() -> u32 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendsConfig {
    /// Base URL of the trend feed (e.g., `https://trends.example.com`).
    #[serde(default)]
    pub source_url: String,

    /// Optional API key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: String,

    /// Region code passed to the feed.
    #[serde(default = "default_region")]
    pub region: String,

    /// TTL applied to every cached trend batch, in minutes.
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u32,

    /// Minimum upstream score (0–100) for a trend to be watched.
    #[serde(default = "default_min_trend_score")]
    pub min_trend_score: u32,

    /// Default number of trends considered per cycle.
    #[serde(default = "default_max_trends")]
    pub max_trends: u32,

    /// Fetch attempts before falling back to synthetic trends.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between cycles in periodic mode, in minutes.
    #[serde(default = "default_watch_interval_minutes")]
    pub watch_interval_minutes: u32,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            api_key: String::new(),
            region: default_region(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            min_trend_score: default_min_trend_score(),
            max_trends: default_max_trends(),
            fetch_attempts: default_fetch_attempts(),
            timeout_secs: default_timeout_secs(),
            watch_interval_minutes: default_watch_interval_minutes(),
        }
    }
}

impl TrendsConfig {
    /// Check if an upstream feed URL is configured.
    pub fn is_configured(&self) -> bool {
        !self.source_url.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::invalid("trends.region", "must not be empty"));
        }
        if self.cache_ttl_minutes == 0 {
            return Err(ConfigError::invalid(
                "trends.cache_ttl_minutes",
                "must be greater than zero",
            ));
        }
        if self.min_trend_score > 100 {
            return Err(ConfigError::invalid(
                "trends.min_trend_score",
                format!("{} is outside 0..=100", self.min_trend_score),
            ));
        }
        if self.fetch_attempts == 0 {
            return Err(ConfigError::invalid(
                "trends.fetch_attempts",
                "at least one attempt is required",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "trends.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = TrendsConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.region, "US");
        assert_eq!(config.cache_ttl_minutes, 120);
        assert_eq!(config.min_trend_score, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_score_above_hundred() {
        let config = TrendsConfig {
            min_trend_score: 101,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_zero_ttl() {
        let config = TrendsConfig {
            cache_ttl_minutes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
