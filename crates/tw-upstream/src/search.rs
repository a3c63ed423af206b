//! Content-search clients.
//!
//! The search service answers a free-text query with ranked archive items,
//! each carrying a relevance score in `[0, 1]` and an optional section.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tw_config::SearchConfig;

use crate::error::UpstreamError;
use crate::http::{build_client, check_response};

/// One ranked result from a content search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub item_id: String,
    pub title: Option<String>,
    pub section: Option<String>,
    pub url: Option<String>,
    /// Relevance in `[0, 1]`, as reported by the service.
    pub relevance: f64,
}

/// Ranked search over the content archive.
#[async_trait]
pub trait ContentSearch: Send + Sync {
    /// Search for `query`, optionally restricted to one section.
    ///
    /// `Ok(vec![])` means the archive has nothing relevant.
    async fn search(
        &self,
        query: &str,
        limit: u32,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>, UpstreamError>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    mode: &'static str,
    rerank: bool,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<&'a str>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    chunk: Option<RawDoc>,
    #[serde(default)]
    metadata: Option<RawDoc>,
}

#[derive(Deserialize, Default)]
struct RawDoc {
    #[serde(default, alias = "article_id")]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Archive search over HTTP: `POST {base}/v1/search` with an `x-api-key`.
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSearchClient {
    /// # Errors
    ///
    /// Returns [`UpstreamError::NotConfigured`] when no search URL is set, or
    /// [`UpstreamError::Http`] if the client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self, UpstreamError> {
        if !config.is_configured() {
            return Err(UpstreamError::NotConfigured("content search"));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl ContentSearch for HttpSearchClient {
    async fn search(
        &self,
        query: &str,
        limit: u32,
        section: Option<&str>,
    ) -> Result<Vec<SearchHit>, UpstreamError> {
        let body = SearchRequest {
            query,
            mode: "hybrid",
            rerank: true,
            limit,
            section,
        };
        let mut request = self
            .http
            .post(format!("{}/v1/search", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let resp = check_response(request.send().await?).await?;
        let hits = parse_hits(&resp.text().await?)?;
        tracing::debug!(query, hits = hits.len(), "content search returned");
        Ok(hits)
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map a search body to hits. Results without an item id are dropped.
fn parse_hits(body: &str) -> Result<Vec<SearchHit>, UpstreamError> {
    let data: SearchResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    Ok(data
        .results
        .into_iter()
        .filter_map(|raw| {
            let chunk = raw.chunk.unwrap_or_default();
            let meta = raw.metadata.unwrap_or_default();
            let item_id = chunk
                .id
                .as_ref()
                .and_then(id_string)
                .or_else(|| meta.id.as_ref().and_then(id_string));
            let Some(item_id) = item_id else {
                tracing::debug!("dropping search hit without an item id");
                return None;
            };
            Some(SearchHit {
                item_id,
                title: chunk.title.or(meta.title),
                section: meta.section.or(chunk.section),
                url: meta.url.or(chunk.url),
                relevance: raw
                    .score
                    .filter(|s| s.is_finite())
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "results": [
            {
                "score": 0.91,
                "chunk": {"article_id": 4412, "title": "The Rules for Machines", "section": "technology"},
                "metadata": {"section": "politics", "url": "https://example.com/a/4412"}
            },
            {
                "score": 0.4,
                "metadata": {"id": "a-77", "title": "Who Governs AI?"}
            },
            {
                "score": 0.8,
                "chunk": {"title": "no id here"}
            },
            {
                "score": 1.4,
                "chunk": {"article_id": "a-90"}
            }
        ]
    }"#;

    #[test]
    fn parses_hits_from_chunk_and_metadata() {
        let hits = parse_hits(FIXTURE).unwrap();
        assert_eq!(hits.len(), 3);

        assert_eq!(hits[0].item_id, "4412");
        assert_eq!(hits[0].title.as_deref(), Some("The Rules for Machines"));
        assert_eq!(hits[0].section.as_deref(), Some("politics"));
        assert_eq!(hits[0].relevance, 0.91);

        assert_eq!(hits[1].item_id, "a-77");
        assert_eq!(hits[1].section, None);

        assert_eq!(hits[2].item_id, "a-90");
        assert_eq!(hits[2].relevance, 1.0);
    }

    #[test]
    fn empty_results_are_not_an_error() {
        assert!(parse_hits(r#"{"results": []}"#).unwrap().is_empty());
        assert!(parse_hits("{}").unwrap().is_empty());
    }

    #[test]
    fn request_omits_missing_section() {
        let body = SearchRequest {
            query: "AI Regulation",
            mode: "hybrid",
            rerank: true,
            limit: 10,
            section: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["limit"], 10);
        assert!(json.get("section").is_none());
    }

    #[test]
    fn unconfigured_client_is_rejected() {
        assert!(matches!(
            HttpSearchClient::from_config(&SearchConfig::default()),
            Err(UpstreamError::NotConfigured(_))
        ));
    }
}
