//! Upstream error types.

use thiserror::Error;

/// Errors from the trend feed or the content-search service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP transport error (connect failure, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The service returned 429 Too Many Requests.
    #[error("throttled, retry after {retry_after_secs}s")]
    Throttled {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// No endpoint is configured for this service.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl UpstreamError {
    /// Whether the error is a throttling response, which backs off harder.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}
