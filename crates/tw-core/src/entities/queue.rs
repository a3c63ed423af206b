use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ConfidenceLevel, QueueStatus, TrendOrigin};

/// A delivery candidate in the proactive queue.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub dedup_key: String,
    pub trend_id: Option<i64>,
    pub trend_keyword: String,
    pub origin: TrendOrigin,
    pub priority_score: f64,
    pub status: QueueStatus,
    pub overall_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub sections_involved: u32,
    pub total_articles: u32,
    pub times_surfaced: u32,
    pub created_at: DateTime<Utc>,
    pub last_surfaced_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Serialized rendering payload (JSON).
    pub payload: String,
}

/// One scored item persisted alongside the queue entry it produced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MatchRecord {
    pub id: i64,
    pub trend_id: Option<i64>,
    pub dedup_key: String,
    pub item_id: String,
    pub section: String,
    pub relevance_score: f64,
    pub story_score: f64,
    pub surfaced_at: DateTime<Utc>,
    pub times_surfaced: u32,
    pub last_surfaced_at: DateTime<Utc>,
}
