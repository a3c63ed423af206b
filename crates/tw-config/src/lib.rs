//! # tw-config
//!
//! Layered configuration loading for Trendwatch using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TRENDWATCH_*` prefix, `__` as separator)
//! 2. Project-level `.trendwatch/config.toml`
//! 3. User-level `~/.config/trendwatch/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TRENDWATCH_TRENDS__SOURCE_URL` -> `trends.source_url`,
//! `TRENDWATCH_THRESHOLDS__MIN_TOTAL_ARTICLES` -> `thresholds.min_total_articles`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use tw_config::WatchConfig;
//!
//! let config = WatchConfig::load_with_dotenv().expect("config");
//! if config.trends.is_configured() {
//!     println!("trend feed: {}", config.trends.source_url);
//! }
//! ```

mod error;
mod general;
mod queue;
mod rate_limit;
mod search;
mod thresholds;
mod trends;

pub use error::ConfigError;
pub use general::GeneralConfig;
pub use queue::QueueConfig;
pub use rate_limit::RateLimitConfig;
pub use search::SearchConfig;
pub use thresholds::ThresholdConfig;
pub use trends::TrendsConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl WatchConfig {
    /// Load and validate configuration from all sources.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` when a source cannot be parsed and
    /// `ConfigError::InvalidValue` when a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".trendwatch/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("TRENDWATCH_").split("__"))
    }

    /// Reject malformed values in every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trends.validate()?;
        self.rate_limit.validate()?;
        self.search.validate()?;
        self.thresholds.validate()?;
        self.queue.validate()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("trendwatch").join("config.toml"))
    }

    /// Walks up from `CARGO_MANIFEST_DIR` (or the current dir) looking for `.env`.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = WatchConfig::default();
        assert!(!config.trends.is_configured());
        assert!(!config.search.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn project_toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_dir(".trendwatch")?;
            jail.create_file(
                ".trendwatch/config.toml",
                r#"
                [trends]
                source_url = "https://trends.example.com"
                region = "GB"

                [thresholds]
                min_total_articles = 5
                "#,
            )?;

            let config = WatchConfig::from_figment(&WatchConfig::figment())
                .map_err(|e| e.to_string())?;
            assert!(config.trends.is_configured());
            assert_eq!(config.trends.region, "GB");
            assert_eq!(config.thresholds.min_total_articles, 5);
            assert_eq!(config.queue.dedup_hours, 24);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_dir(".trendwatch")?;
            jail.create_file(
                ".trendwatch/config.toml",
                "[queue]\ndedup_hours = 12\n",
            )?;
            jail.set_env("TRENDWATCH_QUEUE__DEDUP_HOURS", "48");
            jail.set_env("TRENDWATCH_SEARCH__URL", "https://search.example.com");

            let config = WatchConfig::from_figment(&WatchConfig::figment())
                .map_err(|e| e.to_string())?;
            assert_eq!(config.queue.dedup_hours, 48);
            assert!(config.search.is_configured());
            Ok(())
        });
    }

    #[test]
    fn invalid_threshold_is_rejected_at_load() {
        Jail::expect_with(|jail| {
            jail.set_env("TRENDWATCH_THRESHOLDS__MIN_STORY_SCORE", "1.7");

            let err = WatchConfig::from_figment(&WatchConfig::figment()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "thresholds.min_story_score"));
            Ok(())
        });
    }

    #[test]
    fn malformed_value_is_a_figment_error() {
        Jail::expect_with(|jail| {
            jail.set_env("TRENDWATCH_TRENDS__CACHE_TTL_MINUTES", "soon");

            let err = WatchConfig::from_figment(&WatchConfig::figment()).unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)));
            Ok(())
        });
    }
}
