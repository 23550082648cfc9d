//! Agent configuration, loaded once at startup and on explicit reload.

use fim_core::{DigestAlgorithm, FimError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::ExcludeRule;

/// Configuration for one integrity monitoring agent.
///
/// Loaded from JSON (`.json` extension) or TOML (anything else) and
/// validated before any scanning begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Roots to walk. Required, absolute, at least one must exist.
    pub monitored_paths: Vec<PathBuf>,

    /// Glob or prefix patterns to skip.
    #[serde(default)]
    pub excluded_paths: Vec<String>,

    /// Seconds between scan cycles (default: 300).
    #[serde(default = "default_scan_interval", alias = "scan_interval")]
    pub scan_interval_seconds: u64,

    /// Content digest; only `sha256` is accepted.
    #[serde(default, alias = "hash_algorithm")]
    pub digest_algorithm: DigestAlgorithm,

    /// Paths whose modification or deletion is HIGH severity.
    #[serde(default = "default_critical_paths")]
    pub critical_paths: Vec<PathBuf>,

    /// Where the baseline JSON lives.
    #[serde(default = "default_baseline_file")]
    pub baseline_file: PathBuf,

    /// Newline-delimited JSON event log, appended per scan.
    #[serde(default = "default_event_log")]
    pub event_log: PathBuf,

    /// Latest scan report, overwritten after every scan.
    #[serde(default)]
    pub report_file: Option<PathBuf>,

    /// Metrics HTTP listen address (default: 0.0.0.0:8080).
    #[serde(default = "default_metrics_listen")]
    pub metrics_listen: SocketAddr,

    /// Change count at which a scan raises an alert log line; 0 disables.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: usize,

    /// Scan immediately on start instead of after the first interval.
    #[serde(default = "default_true")]
    pub scan_on_start: bool,
}

impl AgentConfig {
    /// Config with the given roots and defaults for everything else.
    #[must_use]
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            monitored_paths: roots,
            excluded_paths: Vec::new(),
            scan_interval_seconds: default_scan_interval(),
            digest_algorithm: DigestAlgorithm::default(),
            critical_paths: default_critical_paths(),
            baseline_file: default_baseline_file(),
            event_log: default_event_log(),
            report_file: None,
            metrics_listen: default_metrics_listen(),
            alert_threshold: default_alert_threshold(),
            scan_on_start: true,
        }
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FimError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse without validating.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| FimError::Config(e.to_string()))
    }

    /// Parse without validating.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FimError::Config(e.to_string()))
    }

    /// Fail fast on anything that would make scanning meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.monitored_paths.is_empty() {
            return Err(FimError::Config("monitored_paths is empty".into()));
        }
        if let Some(rel) = self.monitored_paths.iter().find(|p| !p.is_absolute()) {
            return Err(FimError::Config(format!(
                "monitored path {} is not absolute",
                rel.display()
            )));
        }
        if !self.monitored_paths.iter().any(|p| p.exists()) {
            return Err(FimError::Config(
                "none of the monitored paths exist".into(),
            ));
        }
        if self.scan_interval_seconds == 0 {
            return Err(FimError::Config(
                "scan_interval_seconds must be greater than zero".into(),
            ));
        }
        if let Some(rel) = self.critical_paths.iter().find(|p| !p.is_absolute()) {
            return Err(FimError::Config(format!(
                "critical path {} is not absolute",
                rel.display()
            )));
        }
        for pattern in &self.excluded_paths {
            ExcludeRule::parse(pattern)?;
        }
        Ok(())
    }

    /// Scan interval as a `Duration`.
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }

    /// Files the agent itself writes; never monitored.
    #[must_use]
    pub fn owned_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.baseline_file.clone(), self.event_log.clone()];
        files.extend(self.report_file.iter().cloned());
        files
    }
}

// Default value functions for serde.
const fn default_scan_interval() -> u64 {
    300
}

const fn default_alert_threshold() -> usize {
    10
}

const fn default_true() -> bool {
    true
}

fn default_critical_paths() -> Vec<PathBuf> {
    [
        "/etc/passwd",
        "/etc/shadow",
        "/etc/group",
        "/etc/sudoers",
        "/etc/sudoers.d",
        "/etc/pam.d",
        "/etc/ssh/sshd_config",
        "/bin/sh",
        "/bin/bash",
        "/usr/bin/sudo",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

fn default_baseline_file() -> PathBuf {
    PathBuf::from("/var/lib/fim/baseline.json")
}

fn default_event_log() -> PathBuf {
    PathBuf::from("/var/log/fim/events.jsonl")
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
