//! Trend feed clients.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tw_config::TrendsConfig;
use tw_core::entities::TrendSignal;
use tw_core::enums::TrendCategory;

use crate::error::UpstreamError;
use crate::http::{build_client, check_response};

/// A provider of currently trending keywords.
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Fetch the current trend list for a region.
    ///
    /// An empty list is a valid answer. Throttling surfaces as
    /// [`UpstreamError::Throttled`].
    async fn fetch_trends(&self, region: &str) -> Result<Vec<TrendSignal>, UpstreamError>;

    /// Source name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

#[derive(Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    trends: Vec<RawTrend>,
}

#[derive(Deserialize)]
struct RawTrend {
    keyword: String,
    score: f64,
    category: String,
    #[serde(default)]
    velocity: Option<f64>,
}

/// JSON trend feed reached over HTTP: `GET {base}/trends?geo={region}`.
pub struct HttpTrendSource {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTrendSource {
    /// # Errors
    ///
    /// Returns [`UpstreamError::NotConfigured`] when no feed URL is set, or
    /// [`UpstreamError::Http`] if the client cannot be built.
    pub fn from_config(config: &TrendsConfig) -> Result<Self, UpstreamError> {
        if !config.is_configured() {
            return Err(UpstreamError::NotConfigured("trend feed"));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.source_url.trim_end_matches('/').to_string(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl TrendSource for HttpTrendSource {
    async fn fetch_trends(&self, region: &str) -> Result<Vec<TrendSignal>, UpstreamError> {
        let url = format!("{}/trends?geo={}", self.base_url, urlencoding::encode(region));
        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let resp = check_response(request.send().await?).await?;
        parse_trends(&resp.text().await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Map a feed body to signals, skipping entries that cannot be represented.
fn parse_trends(body: &str) -> Result<Vec<TrendSignal>, UpstreamError> {
    let data: TrendsResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    Ok(data
        .trends
        .into_iter()
        .filter_map(|raw| match raw.category.parse::<TrendCategory>() {
            Ok(category) if raw.score.is_finite() && raw.score >= 0.0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let score = raw.score.round().min(100.0) as u32;
                Some(TrendSignal {
                    keyword: raw.keyword,
                    score,
                    category,
                    velocity: raw.velocity.filter(|v| v.is_finite()),
                })
            }
            Ok(_) => {
                tracing::warn!(keyword = %raw.keyword, score = raw.score, "skipping trend with invalid score");
                None
            }
            Err(e) => {
                tracing::warn!(keyword = %raw.keyword, %e, "skipping trend with unknown category");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "trends": [
            {"keyword": "AI Regulation", "score": 90, "category": "rising", "velocity": 78.0},
            {"keyword": "World Cup", "score": 72.6, "category": "TOP"},
            {"keyword": "Mystery", "score": 40, "category": "viral"},
            {"keyword": "Broken", "score": -5, "category": "top"}
        ]
    }"#;

    #[test]
    fn parses_and_normalizes_feed() {
        let signals = parse_trends(FIXTURE).unwrap();
        assert_eq!(signals.len(), 2);

        assert_eq!(signals[0].keyword, "AI Regulation");
        assert_eq!(signals[0].score, 90);
        assert_eq!(signals[0].category, TrendCategory::Rising);
        assert_eq!(signals[0].velocity, Some(78.0));

        assert_eq!(signals[1].score, 73);
        assert_eq!(signals[1].category, TrendCategory::Top);
        assert_eq!(signals[1].velocity, None);
    }

    #[test]
    fn missing_trends_key_is_empty() {
        assert!(parse_trends("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            parse_trends("<html>"),
            Err(UpstreamError::Parse(_))
        ));
    }

    #[test]
    fn unconfigured_source_is_rejected() {
        let err = HttpTrendSource::from_config(&TrendsConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, UpstreamError::NotConfigured(_)));
    }
}
