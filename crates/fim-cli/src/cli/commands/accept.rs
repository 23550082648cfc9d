//! `fim-agent --accept-baseline` - fold current state into the baseline.

use anyhow::{Context as _, Result};
use fim_agent::{Agent, AgentConfig, AgentMetrics};

use super::{blocking, Context};
use crate::output;

pub async fn execute(ctx: Context, config: AgentConfig) -> Result<()> {
    let agent = Agent::new(config, AgentMetrics::shared()?).context("invalid configuration")?;
    let path = agent.store().path().to_path_buf();

    let acceptance = blocking(move || {
        agent
            .accept_baseline()
            .context("failed to accept current state")
    })
    .await?;

    output::baseline_accepted(ctx.output_format, &acceptance, &path)
}
