//! Content-search service configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_max_results() -> u32 {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Base URL of the archive search API.
    #[serde(default)]
    pub url: String,

    /// API key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: String,

    /// Results requested per trend.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(ConfigError::invalid(
                "search.max_results",
                "must be greater than zero",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "search.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
