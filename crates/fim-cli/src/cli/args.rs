//! Command-line argument definitions using clap.

use clap::{Args, Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Default configuration file location.
pub const DEFAULT_CONFIG: &str = "/etc/fim/fim-config.json";

/// File integrity monitor
///
/// Records a baseline of monitored files, reports drift from it, and serves
/// Prometheus metrics while running continuously.
///
/// Without a mode flag the agent scans on the configured interval until
/// SIGINT or SIGTERM. SIGHUP reloads the configuration file.
#[derive(Parser, Debug)]
#[command(name = "fim-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON if it ends in .json, TOML otherwise)
    #[arg(short, long, env = "FIM_CONFIG", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Metrics listen address, overriding the configuration file
    #[arg(long, value_name = "ADDR")]
    pub metrics_listen: Option<SocketAddr>,

    /// Do not start the metrics HTTP server
    #[arg(long, conflicts_with = "metrics_listen")]
    pub no_metrics: bool,

    /// Output format for summaries
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// One-shot modes. At most one may be given.
#[derive(Args, Debug, Default, Clone, Copy)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Compare the filesystem against the baseline once and exit
    #[arg(long)]
    pub scan_once: bool,

    /// Record the current state as a new baseline and exit
    #[arg(long)]
    pub init_baseline: bool,

    /// Accept all current differences into the baseline and exit
    #[arg(long)]
    pub accept_baseline: bool,
}

/// What this invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run,
    ScanOnce,
    InitBaseline,
    AcceptBaseline,
}

impl ModeArgs {
    pub const fn mode(self) -> Mode {
        if self.scan_once {
            Mode::ScanOnce
        } else if self.init_baseline {
            Mode::InitBaseline
        } else if self.accept_baseline {
            Mode::AcceptBaseline
        } else {
            Mode::Run
        }
    }
}

/// Log line formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}
