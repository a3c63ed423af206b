//! Fixed fallback trend set.
//!
//! Used only when every upstream fetch attempt in a cycle fails, so the rest
//! of the pipeline still runs. Synthetic trends carry origin `synthetic`,
//! have no row id, and are never written to the trend cache.

use chrono::{DateTime, Duration, Utc};
use tw_core::entities::Trend;
use tw_core::enums::{TrendCategory, TrendOrigin};

struct Seed {
    keyword: &'static str,
    score: u32,
    category: TrendCategory,
    velocity: Option<f64>,
}

const SEEDS: &[Seed] = &[
    Seed {
        keyword: "AI Regulation",
        score: 90,
        category: TrendCategory::Rising,
        velocity: Some(78.0),
    },
    Seed {
        keyword: "Climate Summit",
        score: 82,
        category: TrendCategory::Top,
        velocity: None,
    },
    Seed {
        keyword: "Interest Rates",
        score: 74,
        category: TrendCategory::Rising,
        velocity: Some(32.0),
    },
    Seed {
        keyword: "Transit Strike",
        score: 66,
        category: TrendCategory::Breakout,
        velocity: Some(140.0),
    },
    Seed {
        keyword: "School Budget",
        score: 58,
        category: TrendCategory::Top,
        velocity: None,
    },
    Seed {
        keyword: "Farmers Market",
        score: 35,
        category: TrendCategory::Top,
        velocity: None,
    },
];

/// The synthetic set, highest score first, recorded at `now`.
#[must_use]
pub fn synthetic_trends(region: &str, now: DateTime<Utc>, ttl: Duration) -> Vec<Trend> {
    SEEDS
        .iter()
        .map(|seed| Trend {
            id: None,
            keyword: seed.keyword.to_string(),
            score: seed.score,
            category: seed.category,
            velocity: seed.velocity,
            region: region.to_string(),
            origin: TrendOrigin::Synthetic,
            recorded_at: now,
            expires_at: now + ttl,
        })
        .collect()
}
