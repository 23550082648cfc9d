//! `fim-agent --init-baseline` - record current state as the baseline.

use anyhow::{Context as _, Result};
use fim_agent::{Agent, AgentConfig, AgentMetrics};

use super::{blocking, Context};
use crate::output;

pub async fn execute(ctx: Context, config: AgentConfig) -> Result<()> {
    let agent = Agent::new(config, AgentMetrics::shared()?).context("invalid configuration")?;
    let path = agent.store().path().to_path_buf();

    let baseline = blocking(move || {
        agent
            .initialize()
            .context("failed to initialize baseline")
    })
    .await?;

    output::baseline_written(ctx.output_format, &baseline, &path)
}
