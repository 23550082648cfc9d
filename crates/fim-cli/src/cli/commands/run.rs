//! Continuous mode: interval scans, metrics server and signal handling.

use anyhow::{Context as _, Result};
use fim_agent::{server, Agent, AgentConfig, AgentMetrics};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::Context;

pub async fn execute(ctx: Context, config: AgentConfig) -> Result<()> {
    let metrics = AgentMetrics::shared()?;
    let listen = config.metrics_listen;
    let agent = Agent::new(config, metrics.clone()).context("invalid configuration")?;

    // Refuse to start rather than fail on the first tick.
    agent
        .load_baseline()
        .context("cannot start without a usable baseline (run with --init-baseline first)")?;

    let cancel = CancellationToken::new();
    let signals = Signals::register().context("failed to register signal handlers")?;
    let (reload_tx, reload_rx) = mpsc::channel(1);

    let metrics_task = if ctx.metrics_enabled {
        let listener = TcpListener::bind(listen)
            .await
            .with_context(|| format!("failed to bind metrics server on {listen}"))?;
        Some(tokio::spawn(server::serve_listener(
            metrics.clone(),
            listener,
            cancel.clone(),
        )))
    } else {
        info!("metrics HTTP server disabled");
        None
    };

    let signal_task = tokio::spawn(signals.dispatch(ctx, cancel.clone(), reload_tx));

    let result = agent.run_forever(cancel.clone(), reload_rx).await;
    cancel.cancel();
    signal_task.abort();

    if let Some(task) = metrics_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "metrics server failed"),
            Err(e) => error!(error = %e, "metrics server task panicked"),
        }
    }

    result.context("scan loop stopped with an error")?;
    info!("shutdown complete");
    Ok(())
}

/// Unix signal streams, registered up front so failures surface at startup.
struct Signals {
    term: Signal,
    int: Signal,
    hup: Signal,
}

impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
            hup: signal(SignalKind::hangup())?,
        })
    }

    /// SIGINT/SIGTERM cancel; SIGHUP re-reads the configuration file and
    /// forwards it to the scan loop.
    async fn dispatch(
        mut self,
        ctx: Context,
        cancel: CancellationToken,
        reloads: mpsc::Sender<AgentConfig>,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = self.term.recv() => {
                    info!("received SIGTERM");
                    break;
                }
                _ = self.int.recv() => {
                    info!("received SIGINT");
                    break;
                }
                _ = self.hup.recv() => {
                    info!(path = %ctx.config_path.display(), "received SIGHUP; reloading configuration");
                    match reload(&ctx) {
                        Ok(config) => {
                            if reloads.send(config).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "configuration reload failed; keeping previous"),
                    }
                }
            }
        }
        cancel.cancel();
    }
}

fn reload(ctx: &Context) -> fim_agent::Result<AgentConfig> {
    let mut config = AgentConfig::load(&ctx.config_path)?;
    if let Some(addr) = ctx.metrics_override {
        config.metrics_listen = addr;
    }
    Ok(config)
}
