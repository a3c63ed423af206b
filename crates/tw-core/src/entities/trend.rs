use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{TrendCategory, TrendOrigin};
use crate::errors::CoreError;

/// Highest popularity score an upstream trend can carry.
pub const MAX_TREND_SCORE: u32 = 100;

/// A raw trend as reported by an upstream feed, before it is timestamped.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrendSignal {
    pub keyword: String,
    pub score: u32,
    pub category: TrendCategory,
    #[serde(default)]
    pub velocity: Option<f64>,
}

/// An externally reported popularity signal with a TTL.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Trend {
    /// Row id in the trend cache; `None` for trends that were never stored.
    pub id: Option<i64>,
    pub keyword: String,
    /// Upstream popularity, 0–100.
    pub score: u32,
    pub category: TrendCategory,
    /// Percent change, when the upstream reports it.
    pub velocity: Option<f64>,
    pub region: String,
    pub origin: TrendOrigin,
    pub recorded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Trend {
    /// Timestamp a signal, validating it at the model boundary.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the keyword is blank, the score is
    /// above 100, the velocity is not finite, or `ttl` is not positive
    /// (which would break `expires_at > recorded_at`).
    pub fn from_signal(
        signal: TrendSignal,
        region: &str,
        origin: TrendOrigin,
        recorded_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, CoreError> {
        let keyword = signal.keyword.trim();
        if keyword.is_empty() {
            return Err(CoreError::Validation("trend keyword is empty".into()));
        }
        if signal.score > MAX_TREND_SCORE {
            return Err(CoreError::Validation(format!(
                "trend score {} for '{keyword}' exceeds {MAX_TREND_SCORE}",
                signal.score
            )));
        }
        if signal.velocity.is_some_and(|v| !v.is_finite()) {
            return Err(CoreError::Validation(format!(
                "trend velocity for '{keyword}' is not a finite number"
            )));
        }
        if ttl <= Duration::zero() {
            return Err(CoreError::Validation(format!(
                "trend TTL must be positive, got {}s",
                ttl.num_seconds()
            )));
        }

        Ok(Self {
            id: None,
            keyword: keyword.to_string(),
            score: signal.score,
            category: signal.category,
            velocity: signal.velocity,
            region: region.to_string(),
            origin,
            recorded_at,
            expires_at: recorded_at + ttl,
        })
    }

    /// Whether the trend is still inside its TTL at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.origin == TrendOrigin::Synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(keyword: &str, score: u32) -> TrendSignal {
        TrendSignal {
            keyword: keyword.into(),
            score,
            category: TrendCategory::Rising,
            velocity: Some(40.0),
        }
    }

    #[test]
    fn from_signal_sets_expiry_after_recording() {
        let now = Utc::now();
        let trend = Trend::from_signal(
            signal("  AI Regulation ", 90),
            "US",
            TrendOrigin::Upstream,
            now,
            Duration::minutes(120),
        )
        .unwrap();

        assert_eq!(trend.keyword, "AI Regulation");
        assert!(trend.expires_at > trend.recorded_at);
        assert!(trend.is_fresh(now));
        assert!(!trend.is_fresh(now + Duration::minutes(121)));
        assert!(trend.id.is_none());
    }

    #[test]
    fn from_signal_rejects_out_of_range_score() {
        let err = Trend::from_signal(
            signal("x", 101),
            "US",
            TrendOrigin::Upstream,
            Utc::now(),
            Duration::minutes(1),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn from_signal_rejects_non_positive_ttl() {
        let err = Trend::from_signal(
            signal("x", 10),
            "US",
            TrendOrigin::Upstream,
            Utc::now(),
            Duration::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn from_signal_rejects_blank_keyword() {
        let err = Trend::from_signal(
            signal("   ", 10),
            "US",
            TrendOrigin::Upstream,
            Utc::now(),
            Duration::minutes(1),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
