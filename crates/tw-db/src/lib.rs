//! # tw-db
//!
//! libSQL persistence for Trendwatch: the TTL trend cache and the
//! deduplicating delivery queue with its persisted match rows.
//!
//! Writers serialize on an in-process write gate and open `BEGIN IMMEDIATE`
//! transactions, so a dedup lookup and the insert or update that follows it
//! are atomic even with several cycles sharing the store. Repository reads
//! take the same gate: there is one connection, and an open transaction's
//! rows are visible on it before commit.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;

use error::DatabaseError;
use libsql::{Builder, TransactionBehavior};
use tokio::sync::{Mutex, MutexGuard};

pub use repos::dedup_queue::{DedupQueue, NewQueueEntry, QueueFilter, UpsertOutcome};
pub use repos::trend_cache::TrendCache;

/// How long a connection waits on a lock held by another process.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Central database handle shared by the repositories.
pub struct WatchDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    write_gate: Mutex<()>,
}

impl WatchDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;
        // PRAGMA busy_timeout returns a row, so it goes through query().
        conn.query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;

        let watch_db = Self {
            db,
            conn,
            write_gate: Mutex::new(()),
        };
        watch_db.run_migrations().await?;
        Ok(watch_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    ///
    /// Queries issued here bypass the write gate and can observe rows of a
    /// transaction that is still open. Repositories read under
    /// the read gate instead.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Wait for any open write transaction to finish and hold it off while
    /// reading.
    pub(crate) async fn read_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Take the write gate and open an immediate transaction.
    ///
    /// The guard must outlive the transaction; callers hold both until
    /// commit or rollback.
    pub(crate) async fn begin_write(
        &self,
    ) -> Result<(MutexGuard<'_, ()>, libsql::Transaction), DatabaseError> {
        let guard = self.write_gate.lock().await;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok((guard, tx))
    }
}

/// Commit on success, roll back on failure, and hand back the result.
pub(crate) async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(%rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
