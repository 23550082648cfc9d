//! CLI argument parsing and mode dispatch.

pub mod args;
pub mod commands;

use anyhow::{Context as _, Result};
use args::{Cli, Mode};
use clap::Parser;
use fim_agent::AgentConfig;
use tracing::debug;

use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format)?;

    let mut config = AgentConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(addr) = cli.metrics_listen {
        config.metrics_listen = addr;
    }
    debug!(config = %cli.config.display(), "configuration loaded");

    let ctx = commands::Context {
        config_path: cli.config,
        output_format: cli.output,
        metrics_enabled: !cli.no_metrics,
        metrics_override: cli.metrics_listen,
    };

    match cli.mode.mode() {
        Mode::Run => commands::run::execute(ctx, config).await,
        Mode::ScanOnce => commands::scan::execute(ctx, config).await,
        Mode::InitBaseline => commands::init::execute(ctx, config).await,
        Mode::AcceptBaseline => commands::accept::execute(ctx, config).await,
    }
}
