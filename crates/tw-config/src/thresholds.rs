//! Threshold gate configuration for the match scorer.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_min_story_score() -> f64 {
    0.30
}

const fn default_min_articles_per_section() -> u32 {
    1
}

const fn default_min_sections_with_matches() -> u32 {
    1
}

const fn default_min_total_articles() -> u32 {
    3
}

const fn default_min_match_score() -> f64 {
    0.30
}

const fn default_max_sections_to_show() -> u32 {
    5
}

/// Hard pass/fail limits applied to every scored batch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ThresholdConfig {
    /// Lowest story score allowed among the items of a passing batch.
    #[serde(default = "default_min_story_score")]
    pub min_story_score: f64,

    /// Every section present must hold at least this many items.
    #[serde(default = "default_min_articles_per_section")]
    pub min_articles_per_section: u32,

    /// Number of distinct sections required.
    #[serde(default = "default_min_sections_with_matches")]
    pub min_sections_with_matches: u32,

    /// Number of items required overall.
    #[serde(default = "default_min_total_articles")]
    pub min_total_articles: u32,

    /// Items scoring below this are dropped before aggregation.
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,

    /// Sections rendered into a queue payload.
    #[serde(default = "default_max_sections_to_show")]
    pub max_sections_to_show: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_story_score: default_min_story_score(),
            min_articles_per_section: default_min_articles_per_section(),
            min_sections_with_matches: default_min_sections_with_matches(),
            min_total_articles: default_min_total_articles(),
            min_match_score: default_min_match_score(),
            max_sections_to_show: default_max_sections_to_show(),
        }
    }
}

impl ThresholdConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("thresholds.min_story_score", self.min_story_score),
            ("thresholds.min_match_score", self.min_match_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("{value} is outside [0.0, 1.0]"),
                ));
            }
        }
        if self.max_sections_to_show == 0 {
            return Err(ConfigError::invalid(
                "thresholds.max_sections_to_show",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
