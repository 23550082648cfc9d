//! Prometheus metrics for the integrity agent.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `fim_events_total` | Counter | `kind`, `severity` |
//! | `fim_files_monitored` | Gauge | |
//! | `fim_roots_monitored` | Gauge | |
//! | `fim_roots_unavailable` | Gauge | |
//! | `fim_scan_duration_seconds` | Gauge | |
//! | `fim_read_errors_total` | Counter | |
//! | `fim_scans_total` | Counter | |
//! | `fim_scans_skipped_total` | Counter | |
//! | `fim_last_scan_timestamp_seconds` | Gauge | |
//! | `fim_agent_uptime_seconds` | Gauge | |
//!
//! Each agent owns its own [`Registry`], so independent instances (e.g. in
//! tests) never share counters.

use fim_core::{ChangeKind, FimError, Result, ScanReport, Severity};
use prometheus::{
    Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics shared between the scan loop (writer) and the HTTP server (reader).
pub type SharedMetrics = Arc<AgentMetrics>;

/// All metrics exposed by the agent.
#[derive(Clone)]
pub struct AgentMetrics {
    registry: Registry,
    events_total: IntCounterVec,
    files_monitored: IntGauge,
    roots_monitored: IntGauge,
    roots_unavailable: IntGauge,
    scan_duration: Gauge,
    read_errors_total: IntCounter,
    scans_total: IntCounter,
    scans_skipped_total: IntCounter,
    last_scan_timestamp: Gauge,
    uptime: Gauge,
    started: Instant,
}

impl AgentMetrics {
    /// Create metrics registered in a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let events_total = IntCounterVec::new(
            Opts::new("fim_events_total", "Change events detected, by kind and severity"),
            &["kind", "severity"],
        )
        .map_err(metrics_err)?;
        let files_monitored = IntGauge::new(
            "fim_files_monitored",
            "Files tracked by the most recent scan",
        )
        .map_err(metrics_err)?;
        let roots_monitored =
            IntGauge::new("fim_roots_monitored", "Configured monitored roots").map_err(metrics_err)?;
        let roots_unavailable = IntGauge::new(
            "fim_roots_unavailable",
            "Roots that could not be scanned in the most recent scan",
        )
        .map_err(metrics_err)?;
        let scan_duration = Gauge::new(
            "fim_scan_duration_seconds",
            "Duration of the most recent scan",
        )
        .map_err(metrics_err)?;
        let read_errors_total = IntCounter::new(
            "fim_read_errors_total",
            "Unreadable files, directories and roots encountered",
        )
        .map_err(metrics_err)?;
        let scans_total =
            IntCounter::new("fim_scans_total", "Completed scans").map_err(metrics_err)?;
        let scans_skipped_total = IntCounter::new(
            "fim_scans_skipped_total",
            "Scheduled scans skipped because the previous scan overran",
        )
        .map_err(metrics_err)?;
        let last_scan_timestamp = Gauge::new(
            "fim_last_scan_timestamp_seconds",
            "Unix time the most recent scan started",
        )
        .map_err(metrics_err)?;
        let uptime = Gauge::new("fim_agent_uptime_seconds", "Agent uptime").map_err(metrics_err)?;

        registry
            .register(Box::new(events_total.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(files_monitored.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(roots_monitored.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(roots_unavailable.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(scan_duration.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(read_errors_total.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(scans_total.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(scans_skipped_total.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(last_scan_timestamp.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(uptime.clone()))
            .map_err(metrics_err)?;

        // Pre-create every label pair so all series are exported from the start.
        for kind in ChangeKind::ALL {
            for severity in [Severity::Medium, Severity::High] {
                events_total.with_label_values(&[kind.label(), severity.label()]);
            }
        }

        Ok(Self {
            registry,
            events_total,
            files_monitored,
            roots_monitored,
            roots_unavailable,
            scan_duration,
            read_errors_total,
            scans_total,
            scans_skipped_total,
            last_scan_timestamp,
            uptime,
            started: Instant::now(),
        })
    }

    /// Create shared metrics.
    pub fn shared() -> Result<SharedMetrics> {
        Ok(Arc::new(Self::new()?))
    }

    /// Publish the outcome of one scan.
    pub fn observe_scan(&self, report: &ScanReport) {
        let summary = &report.summary;
        for event in &report.events {
            self.events_total
                .with_label_values(&[event.kind.label(), event.severity.label()])
                .inc();
        }
        self.files_monitored.set(to_i64(summary.files_tracked));
        self.roots_unavailable
            .set(to_i64(summary.unavailable_roots.len()));
        self.scan_duration.set(summary.duration_secs);
        self.read_errors_total.inc_by(summary.read_errors);
        self.scans_total.inc();
        #[allow(clippy::cast_precision_loss)]
        self.last_scan_timestamp
            .set(summary.started_at.timestamp_millis() as f64 / 1000.0);
    }

    pub fn set_roots_monitored(&self, roots: usize) {
        self.roots_monitored.set(to_i64(roots));
    }

    pub fn set_files_monitored(&self, files: usize) {
        self.files_monitored.set(to_i64(files));
    }

    /// Count ticks dropped because a scan was still running.
    pub fn scans_skipped(&self, ticks: u64) {
        self.scans_skipped_total.inc_by(ticks);
    }

    /// Current value of `fim_events_total{kind, severity}`.
    #[must_use]
    pub fn events(&self, kind: ChangeKind, severity: Severity) -> u64 {
        self.events_total
            .with_label_values(&[kind.label(), severity.label()])
            .get()
    }

    #[must_use]
    pub fn scans(&self) -> u64 {
        self.scans_total.get()
    }

    /// Current value of `fim_scans_skipped_total`.
    #[must_use]
    pub fn scans_skipped_count(&self) -> u64 {
        self.scans_skipped_total.get()
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String> {
        self.uptime.set(self.started.elapsed().as_secs_f64());

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| FimError::Metrics(e.to_string()))
    }
}

fn metrics_err(e: prometheus::Error) -> FimError {
    FimError::Metrics(e.to_string())
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
