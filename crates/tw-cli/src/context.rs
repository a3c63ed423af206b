use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tw_config::WatchConfig;
use tw_db::WatchDb;
use tw_upstream::{
    ContentSearch, HttpSearchClient, HttpTrendSource, RateLimiter, TrendSource, Unconfigured,
};
use tw_watch::WatchCycle;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub cycle: WatchCycle,
    pub default_limit: u32,
}

impl AppContext {
    /// Open the database and wire a watch cycle from configuration.
    ///
    /// Missing feed or search endpoints are not fatal here: the cycle gets an
    /// [`Unconfigured`] stand-in and degrades at run time.
    pub async fn init(config: WatchConfig, db_override: Option<&str>) -> anyhow::Result<Self> {
        let db_path = db_override.map_or_else(|| config.general.db_path.clone(), str::to_string);
        ensure_parent_dir(&db_path)?;

        let db = WatchDb::open_local(&db_path)
            .await
            .with_context(|| format!("failed to open database at {db_path}"))?;

        let source: Arc<dyn TrendSource> = if config.trends.is_configured() {
            Arc::new(
                HttpTrendSource::from_config(&config.trends)
                    .context("failed to build trend feed client")?,
            )
        } else {
            Arc::new(Unconfigured("trend feed"))
        };
        let search: Arc<dyn ContentSearch> = if config.search.is_configured() {
            Arc::new(
                HttpSearchClient::from_config(&config.search)
                    .context("failed to build content search client")?,
            )
        } else {
            Arc::new(Unconfigured("content search"))
        };
        let limiter = Arc::new(Mutex::new(RateLimiter::from_config(&config.rate_limit)));
        let default_limit = config.general.default_limit;

        let cycle = WatchCycle::new(config, Arc::new(db), source, search, limiter)?;
        Ok(Self {
            cycle,
            default_limit,
        })
    }
}

fn ensure_parent_dir(db_path: &str) -> anyhow::Result<()> {
    if db_path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Emit warnings for unconfigured endpoints, including likely mistyped env keys.
pub fn warn_unconfigured(config: &WatchConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &WatchConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();
    let mut warnings = Vec::new();

    if !config.trends.is_configured() {
        if has_env_prefix(&env_keys, "TRENDWATCH_TRENDS") {
            warnings.push(
                "Trend feed config appears default while TRENDWATCH_TRENDS* env vars exist. Use double underscores (example: TRENDWATCH_TRENDS__SOURCE_URL)."
                    .to_string(),
            );
        } else {
            warnings.push(
                "No trend feed configured (trends.source_url); watch cycles will use synthetic trends."
                    .to_string(),
            );
        }
    }

    if !config.search.is_configured() {
        if has_env_prefix(&env_keys, "TRENDWATCH_SEARCH") {
            warnings.push(
                "Search config appears default while TRENDWATCH_SEARCH* env vars exist. Use double underscores (example: TRENDWATCH_SEARCH__URL)."
                    .to_string(),
            );
        } else {
            warnings.push(
                "No content search configured (search.url); every trend in a watch cycle will fail."
                    .to_string(),
            );
        }
    }

    warnings
}

fn has_env_prefix(keys: &[String], prefix: &str) -> bool {
    keys.iter().any(|key| key.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use tw_config::WatchConfig;

    use super::{collect_unconfigured_warnings, ensure_parent_dir};

    #[test]
    fn hints_at_double_underscores_for_flat_env_keys() {
        let warnings = collect_unconfigured_warnings(
            &WatchConfig::default(),
            vec![
                ("TRENDWATCH_TRENDS_SOURCE_URL".to_string(), "https://t".to_string()),
                ("TRENDWATCH_SEARCH_URL".to_string(), "https://s".to_string()),
            ],
        );

        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.contains("double underscores")));
    }

    #[test]
    fn reports_missing_endpoints_without_env_hints() {
        let warnings = collect_unconfigured_warnings(&WatchConfig::default(), Vec::new());
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("synthetic"));
    }

    #[test]
    fn does_not_warn_when_endpoints_are_configured() {
        let mut config = WatchConfig::default();
        config.trends.source_url = "https://trends.example.com".into();
        config.search.url = "https://search.example.com".into();

        let warnings = collect_unconfigured_warnings(&config, Vec::new());
        assert!(warnings.is_empty());
    }

    #[test]
    fn creates_missing_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("trendwatch.db");

        ensure_parent_dir(&db_path.to_string_lossy()).unwrap();
        assert!(dir.path().join("nested").is_dir());
        ensure_parent_dir(":memory:").unwrap();
    }
}
