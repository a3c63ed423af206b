//! # tw-upstream
//!
//! Clients for the two external collaborators of a watch cycle:
//! - a trend feed ([`TrendSource`]) reporting currently popular keywords,
//! - a content archive ([`ContentSearch`]) answering ranked searches,
//!
//! plus the [`RateLimiter`] that paces calls to both.

mod error;
mod http;
pub mod rate_limit;
pub mod search;
pub mod source;
mod unconfigured;

pub use error::UpstreamError;
pub use rate_limit::RateLimiter;
pub use search::{ContentSearch, HttpSearchClient, SearchHit};
pub use source::{HttpTrendSource, TrendSource};
pub use unconfigured::Unconfigured;
