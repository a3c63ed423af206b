//! Deduplicating delivery queue.
//!
//! An entry is keyed by `dedup_key`. Re-surfacing the same key within the
//! dedup horizon bumps `times_surfaced` on the entry and its match rows
//! instead of creating a second entry. Each upsert runs as one
//! `BEGIN IMMEDIATE` unit under the store's write gate, so concurrent cycles
//! cannot both miss the lookup and insert twice.
//!
//! ```text
//! pending → sent        (mark_sent)
//!         → dismissed   (dismiss)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tw_core::entities::{MatchRecord, QueueEntry, ScoredItem};
use tw_core::enums::{ConfidenceLevel, QueueStatus, TrendOrigin};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_u32, parse_datetime, parse_enum, parse_optional_datetime};
use crate::{WatchDb, finish};

const QUEUE_COLUMNS: &str = "id, dedup_key, trend_id, trend_keyword, origin, priority_score, status, \
     overall_confidence, confidence_level, sections_involved, total_articles, times_surfaced, \
     created_at, last_surfaced_at, sent_at, payload";

const MATCH_COLUMNS: &str = "id, trend_id, dedup_key, item_id, section, relevance_score, \
     story_score, surfaced_at, times_surfaced, last_surfaced_at";

fn row_to_entry(row: &libsql::Row) -> Result<QueueEntry, DatabaseError> {
    Ok(QueueEntry {
        id: row.get::<i64>(0)?,
        dedup_key: row.get::<String>(1)?,
        trend_id: row.get::<Option<i64>>(2)?,
        trend_keyword: row.get::<String>(3)?,
        origin: parse_enum(&row.get::<String>(4)?)?,
        priority_score: row.get::<f64>(5)?,
        status: parse_enum(&row.get::<String>(6)?)?,
        overall_confidence: row.get::<f64>(7)?,
        confidence_level: parse_enum(&row.get::<String>(8)?)?,
        sections_involved: get_u32(row, 9)?,
        total_articles: get_u32(row, 10)?,
        times_surfaced: get_u32(row, 11)?,
        created_at: parse_datetime(&row.get::<String>(12)?)?,
        last_surfaced_at: parse_datetime(&row.get::<String>(13)?)?,
        sent_at: parse_optional_datetime(row.get::<Option<String>>(14)?.as_deref())?,
        payload: row.get::<String>(15)?,
    })
}

fn row_to_match(row: &libsql::Row) -> Result<MatchRecord, DatabaseError> {
    Ok(MatchRecord {
        id: row.get::<i64>(0)?,
        trend_id: row.get::<Option<i64>>(1)?,
        dedup_key: row.get::<String>(2)?,
        item_id: row.get::<String>(3)?,
        section: row.get::<String>(4)?,
        relevance_score: row.get::<f64>(5)?,
        story_score: row.get::<f64>(6)?,
        surfaced_at: parse_datetime(&row.get::<String>(7)?)?,
        times_surfaced: get_u32(row, 8)?,
        last_surfaced_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Everything needed to queue one trend match.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub dedup_key: String,
    /// `None` for synthetic trends, which are never stored.
    pub trend_id: Option<i64>,
    pub trend_keyword: String,
    pub origin: TrendOrigin,
    pub priority_score: f64,
    pub overall_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub sections_involved: u32,
    pub total_articles: u32,
    pub payload: String,
    /// Scored items persisted as match rows on insert.
    pub items: Vec<ScoredItem>,
}

/// Whether an upsert created a new entry or re-surfaced an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(QueueEntry),
    Updated(QueueEntry),
}

impl UpsertOutcome {
    #[must_use]
    pub const fn entry(&self) -> &QueueEntry {
        match self {
            Self::Created(entry) | Self::Updated(entry) => entry,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Status selection for [`DedupQueue::peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFilter {
    Status(QueueStatus),
    All,
}

impl Default for QueueFilter {
    fn default() -> Self {
        Self::Status(QueueStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// DedupQueue
// ---------------------------------------------------------------------------

pub struct DedupQueue {
    db: Arc<WatchDb>,
    horizon: Duration,
}

impl DedupQueue {
    #[must_use]
    pub fn new(db: Arc<WatchDb>, dedup_hours: u32) -> Self {
        Self {
            db,
            horizon: Duration::hours(i64::from(dedup_hours)),
        }
    }

    /// Insert a pending entry, or re-surface the one created for the same key
    /// within the dedup horizon.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction fails; nothing is written
    /// in that case.
    pub async fn upsert(&self, request: &NewQueueEntry) -> Result<UpsertOutcome, DatabaseError> {
        self.upsert_at(request, Utc::now()).await
    }

    /// [`Self::upsert`] as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction fails.
    pub async fn upsert_at(
        &self,
        request: &NewQueueEntry,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, DatabaseError> {
        let now = now.trunc_subsecs(6);
        let (_guard, tx) = self.db.begin_write().await?;
        let result = self.upsert_in(&tx, request, now).await;
        let outcome = finish(tx, result).await?;

        match &outcome {
            UpsertOutcome::Created(entry) => tracing::info!(
                dedup_key = %entry.dedup_key,
                priority = entry.priority_score,
                "queued new entry"
            ),
            UpsertOutcome::Updated(entry) => tracing::debug!(
                dedup_key = %entry.dedup_key,
                times_surfaced = entry.times_surfaced,
                "re-surfaced existing entry"
            ),
        }
        Ok(outcome)
    }

    async fn upsert_in(
        &self,
        conn: &libsql::Connection,
        request: &NewQueueEntry,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, DatabaseError> {
        let cutoff = format_datetime(now - self.horizon);
        let now_str = format_datetime(now);

        let mut rows = conn
            .query(
                "SELECT id FROM queue
                 WHERE dedup_key = ?1 AND created_at > ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                libsql::params![request.dedup_key.as_str(), cutoff],
            )
            .await?;
        let existing = match rows.next().await? {
            Some(row) => Some(row.get::<i64>(0)?),
            None => None,
        };
        drop(rows);

        if let Some(id) = existing {
            conn.execute(
                "UPDATE queue SET times_surfaced = times_surfaced + 1, last_surfaced_at = ?1
                 WHERE id = ?2",
                libsql::params![now_str.as_str(), id],
            )
            .await?;
            conn.execute(
                "UPDATE matches SET times_surfaced = times_surfaced + 1, last_surfaced_at = ?1
                 WHERE queue_id = ?2",
                libsql::params![now_str.as_str(), id],
            )
            .await?;
            return Ok(UpsertOutcome::Updated(fetch_by_id(conn, id).await?));
        }

        conn.execute(
            "INSERT INTO queue (dedup_key, trend_id, trend_keyword, origin, priority_score, status,
                                overall_confidence, confidence_level, sections_involved, total_articles,
                                times_surfaced, created_at, last_surfaced_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, 1, ?10, ?10, ?11)",
            libsql::params![
                request.dedup_key.as_str(),
                request.trend_id,
                request.trend_keyword.as_str(),
                request.origin.as_str(),
                request.priority_score,
                request.overall_confidence,
                request.confidence_level.as_str(),
                i64::from(request.sections_involved),
                i64::from(request.total_articles),
                now_str.as_str(),
                request.payload.as_str()
            ],
        )
        .await?;
        let id = conn.last_insert_rowid();

        for item in &request.items {
            conn.execute(
                "INSERT INTO matches (queue_id, trend_id, dedup_key, item_id, section, relevance_score,
                                      story_score, surfaced_at, times_surfaced, last_surfaced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?8)",
                libsql::params![
                    id,
                    request.trend_id,
                    request.dedup_key.as_str(),
                    item.item_id.as_str(),
                    item.section.as_str(),
                    item.relevance_score,
                    item.story_score,
                    now_str.as_str()
                ],
            )
            .await?;
        }

        Ok(UpsertOutcome::Created(fetch_by_id(conn, id).await?))
    }

    /// Entries matching `filter`, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn peek(&self, filter: QueueFilter, limit: u32) -> Result<Vec<QueueEntry>, DatabaseError> {
        let _gate = self.db.read_gate().await;
        let mut rows = match filter {
            QueueFilter::Status(status) => {
                self.db
                    .conn()
                    .query(
                        &format!(
                            "SELECT {QUEUE_COLUMNS} FROM queue WHERE status = ?1
                             ORDER BY priority_score DESC, created_at ASC, id ASC LIMIT ?2"
                        ),
                        libsql::params![status.as_str(), i64::from(limit)],
                    )
                    .await?
            }
            QueueFilter::All => {
                self.db
                    .conn()
                    .query(
                        &format!(
                            "SELECT {QUEUE_COLUMNS} FROM queue
                             ORDER BY priority_score DESC, created_at ASC, id ASC LIMIT ?1"
                        ),
                        [i64::from(limit)],
                    )
                    .await?
            }
        };

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Most recent entry for a dedup key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn get(&self, dedup_key: &str) -> Result<Option<QueueEntry>, DatabaseError> {
        let _gate = self.db.read_gate().await;
        latest_for_key(self.db.conn(), dedup_key).await
    }

    /// Match rows persisted for the most recent entry of a dedup key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn matches_for(&self, dedup_key: &str) -> Result<Vec<MatchRecord>, DatabaseError> {
        let _gate = self.db.read_gate().await;
        let Some(entry) = latest_for_key(self.db.conn(), dedup_key).await? else {
            return Ok(Vec::new());
        };
        let mut rows = self
            .db
            .conn()
            .query(
                &format!(
                    "SELECT {MATCH_COLUMNS} FROM matches WHERE queue_id = ?1
                     ORDER BY story_score DESC, item_id ASC"
                ),
                [entry.id],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_match(&row)?);
        }
        Ok(records)
    }

    /// Mark the entry for `dedup_key` as delivered.
    ///
    /// The oldest pending entry for the key is settled; with none pending,
    /// the latest entry is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown key.
    pub async fn mark_sent(&self, dedup_key: &str) -> Result<QueueEntry, DatabaseError> {
        self.transition(dedup_key, QueueStatus::Sent).await
    }

    /// Drop the entry for `dedup_key` from delivery.
    ///
    /// Idempotent like [`Self::mark_sent`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown key.
    pub async fn dismiss(&self, dedup_key: &str) -> Result<QueueEntry, DatabaseError> {
        self.transition(dedup_key, QueueStatus::Dismissed).await
    }

    async fn transition(
        &self,
        dedup_key: &str,
        next: QueueStatus,
    ) -> Result<QueueEntry, DatabaseError> {
        let (_guard, tx) = self.db.begin_write().await?;
        let result = transition_in(&tx, dedup_key, next).await;
        let entry = finish(tx, result).await?;
        tracing::info!(dedup_key, status = %entry.status, "queue entry settled");
        Ok(entry)
    }
}

async fn transition_in(
    conn: &libsql::Connection,
    dedup_key: &str,
    next: QueueStatus,
) -> Result<QueueEntry, DatabaseError> {
    let entry = match oldest_pending_for_key(conn, dedup_key).await? {
        Some(entry) => entry,
        None => latest_for_key(conn, dedup_key)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(dedup_key.to_string()))?,
    };

    if !entry.status.can_transition_to(next) {
        tracing::debug!(
            dedup_key,
            status = %entry.status,
            requested = %next,
            "queue entry already settled"
        );
        return Ok(entry);
    }

    let now = format_datetime(Utc::now().trunc_subsecs(6));
    let sent_at = (next == QueueStatus::Sent).then_some(now.as_str());
    conn.execute(
        "UPDATE queue SET status = ?1, sent_at = COALESCE(?2, sent_at)
         WHERE id = ?3 AND status = 'pending'",
        libsql::params![next.as_str(), sent_at, entry.id],
    )
    .await?;
    fetch_by_id(conn, entry.id).await
}

async fn fetch_by_id(conn: &libsql::Connection, id: i64) -> Result<QueueEntry, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {QUEUE_COLUMNS} FROM queue WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_entry(&row)
}

/// A key can own several entries once the horizon has passed; the oldest
/// pending one is settled first.
async fn oldest_pending_for_key(
    conn: &libsql::Connection,
    dedup_key: &str,
) -> Result<Option<QueueEntry>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {QUEUE_COLUMNS} FROM queue WHERE dedup_key = ?1 AND status = 'pending'
                 ORDER BY created_at ASC, id ASC LIMIT 1"
            ),
            [dedup_key],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_entry(&row)?)),
        None => Ok(None),
    }
}

async fn latest_for_key(
    conn: &libsql::Connection,
    dedup_key: &str,
) -> Result<Option<QueueEntry>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {QUEUE_COLUMNS} FROM queue WHERE dedup_key = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1"
            ),
            [dedup_key],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_entry(&row)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn queue() -> DedupQueue {
        DedupQueue::new(Arc::new(WatchDb::open_local(":memory:").await.unwrap()), 24)
    }

    fn item(id: &str, section: &str, story_score: f64) -> ScoredItem {
        ScoredItem {
            item_id: id.into(),
            section: section.into(),
            relevance_score: story_score,
            story_score,
        }
    }

    fn request(key: &str, priority: f64) -> NewQueueEntry {
        NewQueueEntry {
            dedup_key: key.into(),
            trend_id: None,
            trend_keyword: "AI Regulation".into(),
            origin: TrendOrigin::Synthetic,
            priority_score: priority,
            overall_confidence: 0.756,
            confidence_level: ConfidenceLevel::High,
            sections_involved: 2,
            total_articles: 2,
            payload: "{}".into(),
            items: vec![item("a1", "politics", 0.81), item("a3", "technology", 0.45)],
        }
    }

    #[tokio::test]
    async fn first_upsert_creates_pending_entry_with_matches() {
        let q = queue().await;
        let outcome = q.upsert(&request("ai regulation::a1", 1.134)).await.unwrap();

        assert!(outcome.is_created());
        let entry = outcome.entry();
        assert_eq!(entry.status, QueueStatus::Pending);
        assert_eq!(entry.times_surfaced, 1);
        assert_eq!(entry.sent_at, None);
        assert_eq!(entry.trend_id, None);
        assert_eq!(entry.origin, TrendOrigin::Synthetic);

        let matches = q.matches_for("ai regulation::a1").await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].item_id, "a1");
        assert_eq!(matches[0].times_surfaced, 1);
    }

    #[tokio::test]
    async fn repeat_within_horizon_resurfaces() {
        let q = queue().await;
        let t0 = Utc::now() - Duration::hours(2);
        q.upsert_at(&request("k::1", 1.0), t0).await.unwrap();

        let outcome = q.upsert_at(&request("k::1", 9.0), t0 + Duration::hours(1)).await.unwrap();
        assert!(!outcome.is_created());
        let entry = outcome.entry();
        assert_eq!(entry.times_surfaced, 2);
        assert_eq!(entry.priority_score, 1.0, "priority must not change");
        assert_eq!(entry.last_surfaced_at, (t0 + Duration::hours(1)).trunc_subsecs(6));

        let all = q.peek(QueueFilter::All, 10).await.unwrap();
        assert_eq!(all.len(), 1);

        let matches = q.matches_for("k::1").await.unwrap();
        assert!(matches.iter().all(|m| m.times_surfaced == 2));
    }

    #[tokio::test]
    async fn repeat_after_horizon_creates_new_entry() {
        let q = queue().await;
        let t0 = Utc::now() - Duration::hours(30);
        q.upsert_at(&request("k::1", 1.0), t0).await.unwrap();

        let outcome = q.upsert_at(&request("k::1", 1.0), t0 + Duration::hours(25)).await.unwrap();
        assert!(outcome.is_created());
        assert_eq!(q.peek(QueueFilter::All, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sent_entry_still_blocks_requeue_within_horizon() {
        let q = queue().await;
        q.upsert(&request("k::1", 1.0)).await.unwrap();
        q.mark_sent("k::1").await.unwrap();

        let outcome = q.upsert(&request("k::1", 1.0)).await.unwrap();
        assert!(!outcome.is_created());
        assert_eq!(outcome.entry().status, QueueStatus::Sent);
    }

    #[tokio::test]
    async fn peek_orders_by_priority_and_filters_status() {
        let q = queue().await;
        q.upsert(&request("low::1", 0.3)).await.unwrap();
        q.upsert(&request("high::1", 1.4)).await.unwrap();
        q.upsert(&request("mid::1", 0.9)).await.unwrap();
        q.dismiss("mid::1").await.unwrap();

        let pending = q.peek(QueueFilter::default(), 10).await.unwrap();
        let keys: Vec<_> = pending.iter().map(|e| e.dedup_key.as_str()).collect();
        assert_eq!(keys, vec!["high::1", "low::1"]);

        let dismissed = q
            .peek(QueueFilter::Status(QueueStatus::Dismissed), 10)
            .await
            .unwrap();
        assert_eq!(dismissed.len(), 1);

        let limited = q.peek(QueueFilter::All, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].dedup_key, "high::1");
    }

    #[tokio::test]
    async fn mark_sent_is_idempotent() {
        let q = queue().await;
        q.upsert(&request("k::1", 1.0)).await.unwrap();

        let first = q.mark_sent("k::1").await.unwrap();
        assert_eq!(first.status, QueueStatus::Sent);
        let stamped = first.sent_at.expect("sent_at set");

        let second = q.mark_sent("k::1").await.unwrap();
        assert_eq!(second.status, QueueStatus::Sent);
        assert_eq!(second.sent_at, Some(stamped));
    }

    #[tokio::test]
    async fn dismissed_entry_cannot_be_sent() {
        let q = queue().await;
        q.upsert(&request("k::1", 1.0)).await.unwrap();
        q.dismiss("k::1").await.unwrap();

        let entry = q.mark_sent("k::1").await.unwrap();
        assert_eq!(entry.status, QueueStatus::Dismissed);
        assert_eq!(entry.sent_at, None);
    }

    #[tokio::test]
    async fn settling_a_key_with_two_entries_takes_the_oldest_pending_first() {
        let q = queue().await;
        let t0 = Utc::now() - Duration::hours(30);
        let old = q.upsert_at(&request("k::1", 1.0), t0).await.unwrap();
        let new = q
            .upsert_at(&request("k::1", 1.0), t0 + Duration::hours(25))
            .await
            .unwrap();
        assert!(new.is_created());

        let first = q.mark_sent("k::1").await.unwrap();
        assert_eq!(first.id, old.entry().id);
        assert_eq!(first.status, QueueStatus::Sent);

        let second = q.dismiss("k::1").await.unwrap();
        assert_eq!(second.id, new.entry().id);
        assert_eq!(second.status, QueueStatus::Dismissed);

        // Nothing pending: the latest entry comes back as it is.
        let settled = q.mark_sent("k::1").await.unwrap();
        assert_eq!(settled.id, new.entry().id);
        assert_eq!(settled.status, QueueStatus::Dismissed);
        assert!(q.peek(QueueFilter::default(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let q = queue().await;
        assert!(matches!(
            q.mark_sent("missing::1").await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(q.get("missing::1").await.unwrap().is_none());
        assert!(q.matches_for("missing::1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn interleaved_upserts_create_one_entry() {
        let q = queue().await;
        let r = request("race::1", 1.0);
        let (a, b, c, d) = tokio::join!(q.upsert(&r), q.upsert(&r), q.upsert(&r), q.upsert(&r));

        let created = [a, b, c, d]
            .into_iter()
            .map(Result::unwrap)
            .filter(UpsertOutcome::is_created)
            .count();
        assert_eq!(created, 1);

        let entry = q.get("race::1").await.unwrap().unwrap();
        assert_eq!(entry.times_surfaced, 4);
    }
}
