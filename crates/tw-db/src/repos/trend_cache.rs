//! TTL cache of fetched trends.
//!
//! Rows are never updated. A trend stops being served once `expires_at`
//! passes and is physically removed only by [`TrendCache::purge_expired`].
//! The cache never calls the network; read-through is the caller's job.

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tw_core::entities::{Trend, TrendSignal};
use tw_core::enums::TrendOrigin;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, parse_datetime, parse_enum, parse_optional_datetime};
use crate::{WatchDb, finish};

const TREND_COLUMNS: &str =
    "id, keyword, score, category, velocity, region, origin, recorded_at, expires_at";

fn row_to_trend(row: &libsql::Row) -> Result<Trend, DatabaseError> {
    let score = row.get::<i64>(2)?;
    Ok(Trend {
        id: Some(row.get::<i64>(0)?),
        keyword: row.get::<String>(1)?,
        score: u32::try_from(score)
            .map_err(|_| DatabaseError::Query(format!("trend score {score} out of range")))?,
        category: parse_enum(&row.get::<String>(3)?)?,
        velocity: row.get::<Option<f64>>(4)?,
        region: row.get::<String>(5)?,
        origin: parse_enum(&row.get::<String>(6)?)?,
        recorded_at: parse_datetime(&row.get::<String>(7)?)?,
        expires_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

pub struct TrendCache {
    db: Arc<WatchDb>,
}

impl TrendCache {
    #[must_use]
    pub const fn new(db: Arc<WatchDb>) -> Self {
        Self { db }
    }

    /// Unexpired trends, highest score first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn fresh(&self) -> Result<Vec<Trend>, DatabaseError> {
        self.fresh_at(Utc::now(), None).await
    }

    /// The `limit` highest-scoring unexpired trends.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn current(&self, limit: u32) -> Result<Vec<Trend>, DatabaseError> {
        self.fresh_at(Utc::now(), Some(limit)).await
    }

    /// Unexpired trends as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn fresh_at(
        &self,
        now: DateTime<Utc>,
        limit: Option<u32>,
    ) -> Result<Vec<Trend>, DatabaseError> {
        let limit = limit.map_or(-1, i64::from);
        let _gate = self.db.read_gate().await;
        let mut rows = self
            .db
            .conn()
            .query(
                &format!(
                    "SELECT {TREND_COLUMNS} FROM trends
                     WHERE expires_at > ?1
                     ORDER BY score DESC, id ASC
                     LIMIT ?2"
                ),
                libsql::params![format_datetime(now), limit],
            )
            .await?;

        let mut trends = Vec::new();
        while let Some(row) = rows.next().await? {
            trends.push(row_to_trend(&row)?);
        }
        Ok(trends)
    }

    /// Persist a fetched batch with a shared TTL, stamped now.
    ///
    /// # Errors
    ///
    /// See [`Self::store_at`].
    pub async fn store(
        &self,
        signals: Vec<TrendSignal>,
        region: &str,
        ttl: Duration,
    ) -> Result<Vec<Trend>, DatabaseError> {
        self.store_at(signals, region, ttl, Utc::now()).await
    }

    /// Persist a fetched batch recorded at `now`, returning the stored trends
    /// with their row ids.
    ///
    /// Signals that fail validation are skipped with a warning. The batch is
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` for a non-positive TTL, or a
    /// libSQL error if the write fails (nothing is stored in that case).
    pub async fn store_at(
        &self,
        signals: Vec<TrendSignal>,
        region: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Trend>, DatabaseError> {
        if ttl <= Duration::zero() {
            return Err(DatabaseError::InvalidState(format!(
                "trend TTL must be positive, got {}s",
                ttl.num_seconds()
            )));
        }

        // Match the stored precision so returned trends equal re-read ones.
        let now = now.trunc_subsecs(6);
        let mut trends = Vec::with_capacity(signals.len());
        for signal in signals {
            match Trend::from_signal(signal, region, TrendOrigin::Upstream, now, ttl) {
                Ok(trend) => trends.push(trend),
                Err(e) => tracing::warn!(%e, "skipping invalid trend"),
            }
        }
        if trends.is_empty() {
            return Ok(trends);
        }

        let (_guard, tx) = self.db.begin_write().await?;
        let result = async {
            for trend in &mut trends {
                tx.execute(
                    "INSERT INTO trends (keyword, score, category, velocity, region, origin, recorded_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    libsql::params![
                        trend.keyword.as_str(),
                        i64::from(trend.score),
                        trend.category.as_str(),
                        trend.velocity,
                        trend.region.as_str(),
                        trend.origin.as_str(),
                        format_datetime(trend.recorded_at),
                        format_datetime(trend.expires_at)
                    ],
                )
                .await?;
                trend.id = Some(tx.last_insert_rowid());
            }
            Ok::<(), DatabaseError>(())
        }
        .await;
        finish(tx, result).await?;

        tracing::debug!(count = trends.len(), region, "cached trend batch");
        Ok(trends)
    }

    /// Delete every expired trend. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, DatabaseError> {
        self.purge_expired_at(Utc::now()).await
    }

    /// Delete trends expired as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the delete fails.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let (_guard, tx) = self.db.begin_write().await?;
        let result = tx
            .execute(
                "DELETE FROM trends WHERE expires_at <= ?1",
                [format_datetime(now)],
            )
            .await
            .map_err(DatabaseError::from);
        let removed = finish(tx, result).await?;
        if removed > 0 {
            tracing::info!(removed, "purged expired trends");
        }
        Ok(removed)
    }

    /// When the most recent batch was recorded, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn latest_recorded_at(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let _gate = self.db.read_gate().await;
        let mut rows = self
            .db
            .conn()
            .query("SELECT MAX(recorded_at) FROM trends", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        parse_optional_datetime(row.get::<Option<String>>(0)?.as_deref())
    }
}
