//! Mode implementations.

pub mod accept;
pub mod init;
pub mod run;
pub mod scan;

use anyhow::{Context as _, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Shared context for all modes.
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub output_format: OutputFormat,
    pub metrics_enabled: bool,
    /// `--metrics-listen`, re-applied to reloaded configurations
    pub metrics_override: Option<SocketAddr>,
}

/// Run blocking engine work off the async runtime.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("worker thread panicked")?
}
