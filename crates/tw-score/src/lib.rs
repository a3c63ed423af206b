//! # tw-score
//!
//! Pure scoring for Trendwatch: per-item story scores, aggregate confidence
//! with its threshold gate, and grouping of scored items by section.
//!
//! Nothing here touches the network or the database.

pub mod scorer;
pub mod sections;

pub use scorer::{GateFailure, MatchScorer, priority_score, round3};
pub use sections::group_sections;
