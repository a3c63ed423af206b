//! Entity structs for all Trendwatch domain objects.
//!
//! `Trend`, `QueueEntry` and `MatchRecord` map to tables in the libSQL
//! database. `ScoredItem`, `ConfidenceFactors` and `SectionGroup` are built
//! fresh on every scoring pass and only persist inside a queue payload.

mod confidence;
mod item;
mod queue;
mod section;
mod trend;

pub use confidence::ConfidenceFactors;
pub use item::{DEFAULT_SECTION, ScoredItem};
pub use queue::{MatchRecord, QueueEntry};
pub use section::SectionGroup;
pub use trend::{MAX_TREND_SCORE, Trend, TrendSignal};
