use serde::Serialize;
use tw_core::entities::Trend;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::TrendsArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct CurrentTrends {
    recorded_at: Option<chrono::DateTime<chrono::Utc>>,
    trends: Vec<Trend>,
}

pub async fn handle(args: &TrendsArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(ctx.default_limit);
    let trends = ctx.cycle.current_trends(limit).await?;
    let response = CurrentTrends {
        recorded_at: trends.iter().map(|t| t.recorded_at).max(),
        trends,
    };
    output(&response, flags.format)
}
