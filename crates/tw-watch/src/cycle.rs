//! One watch cycle, end to end.
//!
//! ```text
//! acquire ─► filter ─► for each trend (sequential):
//!                        search ─► score ─► floor ─► group ─► gate ─► upsert
//! ```
//!
//! Every upstream call, feed or search, goes through the shared rate
//! limiter with the limiter held for the duration of the call, so at most
//! one request is in flight per limiter. Each trend is its own unit: a
//! failure is logged and counted and the cycle moves on.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tw_config::WatchConfig;
use tw_core::entities::{QueueEntry, ScoredItem, Trend, TrendSignal};
use tw_core::keys::dedup_key;
use tw_db::{DedupQueue, NewQueueEntry, QueueFilter, TrendCache, UpsertOutcome, WatchDb};
use tw_score::{MatchScorer, group_sections, priority_score};
use tw_upstream::{ContentSearch, RateLimiter, SearchHit, TrendSource, UpstreamError};

use crate::error::WatchError;
use crate::payload::{PayloadLimits, QueuePayload};
use crate::synthetic::synthetic_trends;

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Read the trend cache only; never call the feed.
    pub use_cached_only: bool,
    /// Override `trends.max_trends` for this run.
    pub max_trends: Option<u32>,
    /// Purge expired trends and go to the feed first. The cache is still
    /// read if the feed fails.
    pub force_refresh: bool,
}

/// Where a cycle's candidate trends came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquiredFrom {
    Cache,
    Upstream,
    Synthetic,
}

/// What happened to one trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrendOutcome {
    Created {
        dedup_key: String,
        priority_score: f64,
    },
    Updated {
        dedup_key: String,
        times_surfaced: u32,
    },
    /// Search returned nothing, or nothing cleared the match floor.
    NoSignal,
    BelowThreshold {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub keyword: String,
    #[serde(flatten)]
    pub outcome: TrendOutcome,
}

/// Summary of one run. `created` is the number of new queue entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub acquired_from: AcquiredFrom,
    pub trends_acquired: usize,
    pub trends_checked: usize,
    pub created: usize,
    pub updated: usize,
    pub no_signal: usize,
    pub below_threshold: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub results: Vec<TrendResult>,
}

impl CycleReport {
    fn new(acquired_from: AcquiredFrom, trends_acquired: usize) -> Self {
        Self {
            acquired_from,
            trends_acquired,
            trends_checked: 0,
            created: 0,
            updated: 0,
            no_signal: 0,
            below_threshold: 0,
            failed: 0,
            elapsed_ms: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, keyword: &str, outcome: TrendOutcome) {
        self.trends_checked += 1;
        match &outcome {
            TrendOutcome::Created { .. } => self.created += 1,
            TrendOutcome::Updated { .. } => self.updated += 1,
            TrendOutcome::NoSignal => self.no_signal += 1,
            TrendOutcome::BelowThreshold { .. } => self.below_threshold += 1,
            TrendOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(TrendResult {
            keyword: keyword.to_string(),
            outcome,
        });
    }
}

pub struct WatchCycle {
    config: WatchConfig,
    source: Arc<dyn TrendSource>,
    search: Arc<dyn ContentSearch>,
    limiter: Arc<Mutex<RateLimiter>>,
    cache: TrendCache,
    queue: DedupQueue,
    scorer: MatchScorer,
}

impl WatchCycle {
    /// Wire a cycle from validated configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Config`] if the configuration is invalid.
    pub fn new(
        config: WatchConfig,
        db: Arc<WatchDb>,
        source: Arc<dyn TrendSource>,
        search: Arc<dyn ContentSearch>,
        limiter: Arc<Mutex<RateLimiter>>,
    ) -> Result<Self, WatchError> {
        config.validate()?;
        Ok(Self {
            cache: TrendCache::new(Arc::clone(&db)),
            queue: DedupQueue::new(db, config.queue.dedup_hours),
            scorer: MatchScorer::new(config.thresholds.clone()),
            config,
            source,
            search,
            limiter,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Run one cycle.
    ///
    /// Upstream failures never fail the run: feed failures fall back to the
    /// cache, then to the synthetic set, and search failures are counted per
    /// trend.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] only if the trend cache cannot be
    /// read or written.
    pub async fn run(&self, options: WatchOptions) -> Result<CycleReport, WatchError> {
        let started = Instant::now();
        let (trends, acquired_from) = self.acquire(options).await?;

        let max_trends = options.max_trends.unwrap_or(self.config.trends.max_trends) as usize;
        let min_score = self.config.trends.min_trend_score;
        let candidates: Vec<&Trend> = trends
            .iter()
            .take(max_trends)
            .filter(|t| t.category.is_watchable() && t.score >= min_score)
            .collect();

        tracing::info!(
            source = ?acquired_from,
            acquired = trends.len(),
            candidates = candidates.len(),
            "watch cycle started"
        );

        let mut report = CycleReport::new(acquired_from, trends.len());
        for trend in candidates {
            let outcome = match self.process_trend(trend).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!(keyword = %trend.keyword, %error, "trend processing failed");
                    TrendOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            };
            report.record(&trend.keyword, outcome);
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            checked = report.trends_checked,
            created = report.created,
            updated = report.updated,
            no_signal = report.no_signal,
            below_threshold = report.below_threshold,
            failed = report.failed,
            elapsed_ms = report.elapsed_ms,
            "watch cycle finished"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Acquisition
    // -----------------------------------------------------------------------

    async fn acquire(&self, options: WatchOptions) -> Result<(Vec<Trend>, AcquiredFrom), WatchError> {
        if options.force_refresh {
            self.cache.purge_expired().await?;
        }

        if options.use_cached_only {
            return Ok((self.cache.fresh().await?, AcquiredFrom::Cache));
        }

        if !options.force_refresh {
            let cached = self.cache.fresh().await?;
            if !cached.is_empty() {
                tracing::debug!(count = cached.len(), "serving trends from cache");
                return Ok((cached, AcquiredFrom::Cache));
            }
        }

        let region = self.config.trends.region.as_str();
        let ttl = Duration::minutes(i64::from(self.config.trends.cache_ttl_minutes));
        match self.fetch_signals(region).await {
            Some(signals) => {
                let stored = self.cache.store(signals, region, ttl).await?;
                Ok((stored, AcquiredFrom::Upstream))
            }
            None => {
                // A forced refresh skipped the cache; it still beats demo data.
                if options.force_refresh {
                    let cached = self.cache.fresh().await?;
                    if !cached.is_empty() {
                        tracing::warn!(
                            region,
                            count = cached.len(),
                            "trend feed unavailable, using cached trends"
                        );
                        return Ok((cached, AcquiredFrom::Cache));
                    }
                }
                tracing::warn!(region, "trend feed unavailable, using synthetic trends");
                Ok((synthetic_trends(region, Utc::now(), ttl), AcquiredFrom::Synthetic))
            }
        }
    }

    /// Fetch with up to `fetch_attempts` paced attempts. `None` once every
    /// attempt has failed.
    async fn fetch_signals(&self, region: &str) -> Option<Vec<TrendSignal>> {
        let attempts = self.config.trends.fetch_attempts.max(1);
        for attempt in 1..=attempts {
            match self.paced(self.source.fetch_trends(region)).await {
                Ok(signals) => {
                    tracing::debug!(
                        source = self.source.name(),
                        count = signals.len(),
                        attempt,
                        "fetched trends"
                    );
                    return Some(signals);
                }
                Err(UpstreamError::NotConfigured(what)) => {
                    tracing::debug!(what, "trend feed not configured");
                    return None;
                }
                Err(error) => {
                    tracing::warn!(
                        source = self.source.name(),
                        attempt,
                        attempts,
                        %error,
                        "trend fetch failed"
                    );
                }
            }
        }
        None
    }

    /// Run one upstream call in the limiter's single lane.
    async fn paced<T, F>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let mut limiter = self.limiter.lock().await;
        limiter.wait().await;
        let result = call.await;
        match &result {
            Ok(_) => limiter.record_success(),
            Err(error) => limiter.record_error(error.is_throttled()),
        }
        result
    }

    // -----------------------------------------------------------------------
    // Per-trend processing
    // -----------------------------------------------------------------------

    async fn process_trend(&self, trend: &Trend) -> Result<TrendOutcome, WatchError> {
        let hits = self
            .paced(
                self.search
                    .search(&trend.keyword, self.config.search.max_results, None),
            )
            .await?;
        let hits = dedupe_hits(hits);

        let items: Vec<ScoredItem> = hits
            .iter()
            .map(|hit| {
                self.scorer
                    .score_hit(&hit.item_id, hit.section.as_deref(), hit.relevance, trend)
            })
            .filter(|item| self.scorer.clears_match_floor(item))
            .collect();

        let Some(anchor) = anchor_item(&items) else {
            tracing::debug!(keyword = %trend.keyword, hits = hits.len(), "no matches above floor");
            return Ok(TrendOutcome::NoSignal);
        };

        if let Some(failure) = self.scorer.check_gate(&items) {
            tracing::debug!(keyword = %trend.keyword, %failure, "threshold gate failed");
            return Ok(TrendOutcome::BelowThreshold {
                reason: failure.to_string(),
            });
        }

        let factors = self.scorer.score_aggregate(&items, trend);
        let groups = group_sections(&items);
        let key = dedup_key(&trend.keyword, &anchor.item_id);
        let priority = priority_score(factors.final_confidence, trend.category, &self.config.queue);
        let payload = QueuePayload::build(
            trend,
            factors,
            &groups,
            &hits,
            PayloadLimits {
                max_sections: self.config.thresholds.max_sections_to_show as usize,
                max_items_per_section: self.config.queue.max_items_per_section as usize,
            },
        );

        let request = NewQueueEntry {
            dedup_key: key.clone(),
            trend_id: trend.id,
            trend_keyword: trend.keyword.clone(),
            origin: trend.origin,
            priority_score: priority,
            overall_confidence: factors.final_confidence,
            confidence_level: factors.level(),
            sections_involved: u32::try_from(groups.len()).unwrap_or(u32::MAX),
            total_articles: u32::try_from(items.len()).unwrap_or(u32::MAX),
            payload: payload.to_json()?,
            items,
        };

        match self.queue.upsert(&request).await? {
            UpsertOutcome::Created(entry) => {
                tracing::info!(
                    dedup_key = %entry.dedup_key,
                    priority = entry.priority_score,
                    confidence = entry.overall_confidence,
                    "queued new match"
                );
                Ok(TrendOutcome::Created {
                    dedup_key: entry.dedup_key,
                    priority_score: entry.priority_score,
                })
            }
            UpsertOutcome::Updated(entry) => {
                tracing::debug!(
                    dedup_key = %entry.dedup_key,
                    times_surfaced = entry.times_surfaced,
                    "re-surfaced existing match"
                );
                Ok(TrendOutcome::Updated {
                    dedup_key: entry.dedup_key,
                    times_surfaced: entry.times_surfaced,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Hosting surface
    // -----------------------------------------------------------------------

    /// The `limit` highest-scoring unexpired cached trends.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] if the cache read fails.
    pub async fn current_trends(&self, limit: u32) -> Result<Vec<Trend>, WatchError> {
        Ok(self.cache.current(limit).await?)
    }

    /// Queue entries by descending priority.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] if the query fails.
    pub async fn peek(&self, filter: QueueFilter, limit: u32) -> Result<Vec<QueueEntry>, WatchError> {
        Ok(self.queue.peek(filter, limit).await?)
    }

    /// Mark the oldest pending entry for `key` as sent. With none pending,
    /// the latest entry is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] wrapping `NotFound` for an unknown key.
    pub async fn mark_sent(&self, key: &str) -> Result<QueueEntry, WatchError> {
        Ok(self.queue.mark_sent(key).await?)
    }

    /// Dismiss the oldest pending entry for `key`. With none pending, the
    /// latest entry is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] wrapping `NotFound` for an unknown key.
    pub async fn dismiss(&self, key: &str) -> Result<QueueEntry, WatchError> {
        Ok(self.queue.dismiss(key).await?)
    }

    /// Remove expired trends from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Database`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, WatchError> {
        Ok(self.cache.purge_expired().await?)
    }
}

/// Collapse repeated item ids, keeping the most relevant hit for each.
/// Rank order of first appearance is preserved.
fn dedupe_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<SearchHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(&at) = index.get(&hit.item_id) {
            if hit.relevance > unique[at].relevance {
                unique[at] = hit;
            }
        } else {
            index.insert(hit.item_id.clone(), unique.len());
            unique.push(hit);
        }
    }
    unique
}

/// The item a dedup key is anchored on: the smallest item id in the matched
/// set. Independent of rank order, so a reshuffled result list for the same
/// articles keeps its key.
fn anchor_item(items: &[ScoredItem]) -> Option<&ScoredItem> {
    items.iter().min_by(|a, b| a.item_id.cmp(&b.item_id))
}
