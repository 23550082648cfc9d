//! fim-agent - file integrity monitor
//!
//! Baselines monitored directories, reports drift, and exposes Prometheus
//! metrics while running continuously.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    fim_cli::run().await
}
