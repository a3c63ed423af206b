//! Stand-in for a collaborator with no endpoint configured.

use async_trait::async_trait;
use tw_core::entities::TrendSignal;

use crate::error::UpstreamError;
use crate::search::{ContentSearch, SearchHit};
use crate::source::TrendSource;

/// Answers every call with [`UpstreamError::NotConfigured`].
///
/// Lets a watch cycle be wired when the feed or search URL is missing: an
/// unconfigured feed degrades to the synthetic trend set, an unconfigured
/// search fails each trend with a clear message.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

#[async_trait]
impl TrendSource for Unconfigured {
    async fn fetch_trends(&self, _region: &str) -> Result<Vec<TrendSignal>, UpstreamError> {
        Err(UpstreamError::NotConfigured(self.0))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[async_trait]
impl ContentSearch for Unconfigured {
    async fn search(
        &self,
        _query: &str,
        _limit: u32,
        _section: Option<&str>,
    ) -> Result<Vec<SearchHit>, UpstreamError> {
        Err(UpstreamError::NotConfigured(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_reports_not_configured() {
        let feed = Unconfigured("trend feed");
        let err = feed.fetch_trends("US").await.unwrap_err();
        assert_eq!(err.to_string(), "trend feed is not configured");

        let search = Unconfigured("content search");
        assert!(matches!(
            search.search("AI", 5, None).await,
            Err(UpstreamError::NotConfigured("content search"))
        ));
    }
}
