//! `fim-agent --scan-once` - one comparison against the baseline.
//!
//! Changes are findings, not failures: the exit status is zero whenever the
//! scan itself completed.

use anyhow::{Context as _, Result};
use fim_agent::{Agent, AgentConfig, AgentMetrics};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{blocking, Context};
use crate::output;

pub async fn execute(ctx: Context, config: AgentConfig) -> Result<()> {
    let agent = Agent::new(config, AgentMetrics::shared()?).context("invalid configuration")?;
    let baseline = agent
        .load_baseline()
        .context("cannot scan without a usable baseline (run with --init-baseline first)")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; abandoning scan");
            interrupt.cancel();
        }
    });

    let report = blocking(move || {
        let report = agent.scan_once(&baseline, &cancel).context("scan failed")?;
        agent.publish(&report).context("failed to record scan results")?;
        Ok(report)
    })
    .await;
    watcher.abort();

    output::scan_report(ctx.output_format, &report?)
}
