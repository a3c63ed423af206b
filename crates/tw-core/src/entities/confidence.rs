use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ConfidenceLevel;

/// Every component of an aggregate confidence calculation.
///
/// All values are rounded to three decimals. `threshold_penalty` is either
/// `0.0` (gate passed) or `1.0` (gate failed, `final_confidence` forced to 0).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConfidenceFactors {
    pub base_confidence: f64,
    pub article_count_bonus: f64,
    pub diversity_multiplier: f64,
    pub velocity_multiplier: f64,
    pub threshold_penalty: f64,
    pub final_confidence: f64,
}

impl ConfidenceFactors {
    /// Whether the threshold gate passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.threshold_penalty == 0.0
    }

    #[must_use]
    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.final_confidence)
    }
}
