//! Repositories over a shared [`WatchDb`](crate::WatchDb).

pub mod dedup_queue;
pub mod trend_cache;
