//! General application configuration.

use serde::{Deserialize, Serialize};

/// Default result limit.
const fn default_limit() -> u32 {
    10
}

fn default_db_path() -> String {
    ".trendwatch/trendwatch.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Path to the libSQL database file (`":memory:"` for throwaway runs).
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Default result limit for list commands.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_limit: default_limit(),
        }
    }
}
