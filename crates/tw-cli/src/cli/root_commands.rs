use clap::{Args, Subcommand, ValueEnum};
use tw_core::enums::QueueStatus;
use tw_db::QueueFilter;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run a watch cycle (or keep running on an interval).
    Run(RunArgs),
    /// List current cached trends.
    Trends(TrendsArgs),
    /// List queue entries by priority.
    Queue(QueueArgs),
    /// Mark the entry for a dedup key as sent.
    Send(KeyArgs),
    /// Dismiss the entry for a dedup key.
    Dismiss(KeyArgs),
    /// Delete expired trends from the cache.
    Purge,
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Only use cached trends; never call the trend feed.
    #[arg(long)]
    pub cached_only: bool,

    /// Maximum trends to check (defaults to trends.max_trends).
    #[arg(long)]
    pub max_trends: Option<u32>,

    /// Purge expired trends and fetch fresh ones even if the cache is warm.
    #[arg(long)]
    pub force_refresh: bool,

    /// Repeat every N minutes until interrupted.
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    pub interval_mins: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct TrendsArgs {
    /// Max trends to list.
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct QueueArgs {
    /// Status to list.
    #[arg(long, value_enum, default_value = "pending")]
    pub status: StatusArg,

    /// Max entries to list.
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct KeyArgs {
    /// Dedup key, e.g. "ai regulation::art-101".
    pub key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Sent,
    Dismissed,
    All,
}

impl From<StatusArg> for QueueFilter {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => Self::Status(QueueStatus::Pending),
            StatusArg::Sent => Self::Status(QueueStatus::Sent),
            StatusArg::Dismissed => Self::Status(QueueStatus::Dismissed),
            StatusArg::All => Self::All,
        }
    }
}
