//! Shared HTTP response helpers for upstream clients.
//!
//! Centralizes status-code checks (429 throttling with `Retry-After`
//! parsing, non-success → [`UpstreamError::Api`]) so the individual clients
//! stay focused on request construction and response mapping.

use std::time::Duration;

use crate::error::UpstreamError;

const USER_AGENT: &str = concat!("trendwatch/", env!("CARGO_PKG_VERSION"));

/// Fallback when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Build a client with the shared user agent and a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success.
pub(crate) async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    if resp.status() == 429 {
        return Err(UpstreamError::Throttled {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !resp.status().is_success() {
        return Err(UpstreamError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
