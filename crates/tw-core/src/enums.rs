//! Closed enums for trend categories, provenance, queue status and confidence.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `QueueStatus` provides `allowed_next_states()` to enforce valid transitions
//! at the application layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// TrendCategory
// ---------------------------------------------------------------------------

/// Upstream classification of a trending keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendCategory {
    Rising,
    Top,
    Breakout,
}

impl TrendCategory {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Top => "top",
            Self::Breakout => "breakout",
        }
    }

    /// Whether trends of this category are eligible for a watch cycle.
    ///
    /// Breakout trends are too volatile to match against the archive.
    #[must_use]
    pub const fn is_watchable(self) -> bool {
        matches!(self, Self::Rising | Self::Top)
    }
}

impl fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" => Ok(Self::Rising),
            "top" => Ok(Self::Top),
            "breakout" => Ok(Self::Breakout),
            other => Err(CoreError::Validation(format!(
                "unknown trend category '{other}' (expected rising, top or breakout)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TrendOrigin
// ---------------------------------------------------------------------------

/// Where a trend came from.
///
/// Synthetic trends are the degraded-mode fallback used when the upstream
/// feed cannot be reached. They are never written to the trend cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendOrigin {
    Upstream,
    Synthetic,
}

impl TrendOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for TrendOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QueueStatus
// ---------------------------------------------------------------------------

/// Delivery status of a queue entry.
///
/// ```text
/// pending → sent
///         → dismissed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Sent,
    Dismissed,
}

impl QueueStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Sent, Self::Dismissed],
            Self::Sent | Self::Dismissed => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_next_states().is_empty()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConfidenceLevel
// ---------------------------------------------------------------------------

/// Coarse bucket for an aggregate confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    /// Step function from a confidence score to its level.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.90 {
            Self::VeryHigh
        } else if confidence >= 0.75 {
            Self::High
        } else if confidence >= 0.50 {
            Self::Medium
        } else if confidence >= 0.25 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::VeryLow => "Very Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rising", TrendCategory::Rising)]
    #[case("TOP", TrendCategory::Top)]
    #[case(" breakout ", TrendCategory::Breakout)]
    fn category_parses_case_insensitively(#[case] raw: &str, #[case] expected: TrendCategory) {
        assert_eq!(raw.parse::<TrendCategory>().unwrap(), expected);
    }

    #[test]
    fn category_rejects_unknown_values() {
        let err = "viral".parse::<TrendCategory>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn only_rising_and_top_are_watchable() {
        assert!(TrendCategory::Rising.is_watchable());
        assert!(TrendCategory::Top.is_watchable());
        assert!(!TrendCategory::Breakout.is_watchable());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&TrendCategory::Rising).unwrap();
        assert_eq!(json, "\"rising\"");
    }

    #[test]
    fn queue_status_transitions() {
        assert!(QueueStatus::Pending.can_transition_to(QueueStatus::Sent));
        assert!(QueueStatus::Pending.can_transition_to(QueueStatus::Dismissed));
        assert!(!QueueStatus::Sent.can_transition_to(QueueStatus::Pending));
        assert!(!QueueStatus::Sent.can_transition_to(QueueStatus::Dismissed));
        assert!(!QueueStatus::Dismissed.can_transition_to(QueueStatus::Sent));
        assert!(QueueStatus::Sent.is_terminal());
        assert!(QueueStatus::Dismissed.is_terminal());
        assert!(!QueueStatus::Pending.is_terminal());
    }

    #[rstest]
    #[case(1.0, ConfidenceLevel::VeryHigh)]
    #[case(0.90, ConfidenceLevel::VeryHigh)]
    #[case(0.899, ConfidenceLevel::High)]
    #[case(0.75, ConfidenceLevel::High)]
    #[case(0.50, ConfidenceLevel::Medium)]
    #[case(0.499, ConfidenceLevel::Low)]
    #[case(0.25, ConfidenceLevel::Low)]
    #[case(0.249, ConfidenceLevel::VeryLow)]
    #[case(0.0, ConfidenceLevel::VeryLow)]
    fn confidence_level_step_function(#[case] score: f64, #[case] expected: ConfidenceLevel) {
        assert_eq!(ConfidenceLevel::from_confidence(score), expected);
    }

    #[test]
    fn confidence_level_labels() {
        assert_eq!(ConfidenceLevel::VeryHigh.label(), "Very High");
        assert_eq!(ConfidenceLevel::VeryLow.as_str(), "very_low");
    }
}
