//! Watch cycle error types.

use thiserror::Error;
use tw_config::ConfigError;
use tw_db::error::DatabaseError;
use tw_upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum WatchError {
    /// Rejected configuration, raised before any cycle runs.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("failed to serialize queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}
