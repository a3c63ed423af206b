use std::time::Duration;

use tw_watch::WatchOptions;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::context::AppContext;
use crate::output::output;

pub async fn handle(args: &RunArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let options = WatchOptions {
        use_cached_only: args.cached_only,
        max_trends: args.max_trends,
        force_refresh: args.force_refresh,
    };

    let Some(minutes) = args.interval_mins else {
        let report = ctx.cycle.run(options).await?;
        return output(&report, flags.format);
    };

    let interval = Duration::from_secs(u64::from(minutes) * 60);
    tracing::info!(minutes, "running watch cycles on an interval");
    loop {
        match ctx.cycle.run(options).await {
            Ok(report) => output(&report, flags.format)?,
            Err(error) => tracing::error!(%error, "watch cycle failed"),
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("interrupted, stopping");
                return Ok(());
            }
        }
    }
}
