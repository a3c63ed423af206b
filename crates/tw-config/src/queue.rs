//! Delivery queue configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_dedup_hours() -> u32 {
    24
}

const fn default_rising_priority_multiplier() -> f64 {
    1.5
}

const fn default_priority_multiplier() -> f64 {
    1.2
}

const fn default_max_items_per_section() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QueueConfig {
    /// Window within which repeated matches merge into one entry, in hours.
    #[serde(default = "default_dedup_hours")]
    pub dedup_hours: u32,

    /// Priority multiplier for rising trends.
    #[serde(default = "default_rising_priority_multiplier")]
    pub rising_priority_multiplier: f64,

    /// Priority multiplier for every other category.
    #[serde(default = "default_priority_multiplier")]
    pub priority_multiplier: f64,

    /// Items listed per section in a queue payload.
    #[serde(default = "default_max_items_per_section")]
    pub max_items_per_section: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedup_hours: default_dedup_hours(),
            rising_priority_multiplier: default_rising_priority_multiplier(),
            priority_multiplier: default_priority_multiplier(),
            max_items_per_section: default_max_items_per_section(),
        }
    }
}

impl QueueConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.dedup_hours == 0 {
            return Err(ConfigError::invalid(
                "queue.dedup_hours",
                "must be greater than zero",
            ));
        }
        for (field, value) in [
            (
                "queue.rising_priority_multiplier",
                self.rising_priority_multiplier,
            ),
            ("queue.priority_multiplier", self.priority_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, format!("{value} must be positive")));
            }
        }
        Ok(())
    }
}
