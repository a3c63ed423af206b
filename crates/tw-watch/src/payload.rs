//! Queue payload rendering.
//!
//! The payload is the JSON document stored on a queue entry and handed to
//! whatever delivers it: the trend, the full confidence breakdown, and the
//! strongest sections with their best items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tw_core::entities::{ConfidenceFactors, SectionGroup, Trend};
use tw_core::enums::{ConfidenceLevel, TrendCategory, TrendOrigin};
use tw_upstream::SearchHit;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct QueuePayload {
    pub trend: TrendSummary,
    pub confidence: ConfidenceFactors,
    pub confidence_level: ConfidenceLevel,
    /// Human-readable level, e.g. `"High"`.
    pub confidence_label: String,
    pub total_articles: usize,
    pub sections_involved: usize,
    /// Strongest sections first, at most `max_sections` of them.
    pub sections: Vec<SectionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrendSummary {
    pub keyword: String,
    pub score: u32,
    pub category: TrendCategory,
    pub velocity: Option<f64>,
    pub region: String,
    pub origin: TrendOrigin,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SectionSummary {
    pub name: String,
    pub display_name: String,
    pub article_count: usize,
    pub average_score: f64,
    pub confidence_contribution: f64,
    pub items: Vec<PayloadItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PayloadItem {
    pub item_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub relevance_score: f64,
    pub story_score: f64,
}

/// How much of each grouping makes it into a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub max_sections: usize,
    pub max_items_per_section: usize,
}

impl QueuePayload {
    /// Assemble a payload from an already gated batch.
    ///
    /// `hits` supplies titles and URLs; items without a matching hit are
    /// listed with neither.
    #[must_use]
    pub fn build(
        trend: &Trend,
        factors: ConfidenceFactors,
        groups: &[SectionGroup],
        hits: &[SearchHit],
        limits: PayloadLimits,
    ) -> Self {
        let by_id: HashMap<&str, &SearchHit> =
            hits.iter().map(|hit| (hit.item_id.as_str(), hit)).collect();
        let level = factors.level();

        let sections = groups
            .iter()
            .take(limits.max_sections)
            .map(|group| SectionSummary {
                name: group.name.clone(),
                display_name: group.display_name(),
                article_count: group.count,
                average_score: group.average_score,
                confidence_contribution: group.confidence_contribution,
                items: group
                    .items
                    .iter()
                    .take(limits.max_items_per_section)
                    .map(|item| {
                        let hit = by_id.get(item.item_id.as_str());
                        PayloadItem {
                            item_id: item.item_id.clone(),
                            title: hit.and_then(|h| h.title.clone()),
                            url: hit.and_then(|h| h.url.clone()),
                            relevance_score: item.relevance_score,
                            story_score: item.story_score,
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            trend: TrendSummary {
                keyword: trend.keyword.clone(),
                score: trend.score,
                category: trend.category,
                velocity: trend.velocity,
                region: trend.region.clone(),
                origin: trend.origin,
                recorded_at: trend.recorded_at,
            },
            confidence: factors,
            confidence_level: level,
            confidence_label: level.label().to_string(),
            total_articles: groups.iter().map(|g| g.count).sum(),
            sections_involved: groups.len(),
            sections,
        }
    }

    /// Serialize for storage on a queue entry.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
