//! # tw-watch
//!
//! The watch cycle. One run acquires candidate trends (cache, upstream feed,
//! or the synthetic fallback set), searches the archive for each, scores and
//! gates the matches, and enqueues the survivors in the dedup queue.
//!
//! Everything the cycle touches is injected: the trend source, the content
//! search, the shared rate limiter and the database handle.

pub mod cycle;
pub mod error;
pub mod payload;
pub mod synthetic;

pub use cycle::{AcquiredFrom, CycleReport, TrendOutcome, TrendResult, WatchCycle, WatchOptions};
pub use error::WatchError;
pub use payload::QueuePayload;
