//! The integrity agent: owns its monitored set, baseline store, sinks and
//! metrics, and drives initialize / scan / accept / run-forever.

use chrono::Utc;
use fim_core::{path_key, Baseline, FimError, Result, ScanReport, ScanSummary};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::diff::{self, DiffContext};
use crate::metrics::SharedMetrics;
use crate::monitor::MonitoredSet;
use crate::severity::SeverityPolicy;
use crate::sink::{self, EventLog};
use crate::store::BaselineStore;
use crate::walk::{self, Snapshot};

/// Result of folding current state into a new baseline.
#[derive(Debug)]
pub struct Acceptance {
    /// The baseline now on disk
    pub baseline: Baseline,
    /// The differences that were accepted as known good
    pub accepted: ScanReport,
}

/// What woke the scan loop.
enum Wake {
    Shutdown,
    Reload(Box<AgentConfig>),
    Tick,
}

/// One agent instance. Nothing is global: several agents can coexist in a
/// process, each with its own state and metrics registry.
#[derive(Clone)]
pub struct Agent {
    config: AgentConfig,
    set: MonitoredSet,
    policy: SeverityPolicy,
    store: BaselineStore,
    events: EventLog,
    metrics: SharedMetrics,
    host: String,
}

impl Agent {
    /// Validate `config` and build an agent around it.
    pub fn new(config: AgentConfig, metrics: SharedMetrics) -> Result<Self> {
        config.validate()?;
        let set = MonitoredSet::from_config(&config)?;
        metrics.set_roots_monitored(set.roots().len());

        Ok(Self {
            policy: SeverityPolicy::new(config.critical_paths.clone()),
            store: BaselineStore::new(&config.baseline_file, config.digest_algorithm),
            events: EventLog::new(&config.event_log),
            host: local_host(),
            set,
            config,
            metrics,
        })
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub const fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub const fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Load the stored baseline; missing or corrupt is a structural error.
    pub fn load_baseline(&self) -> Result<Baseline> {
        self.store.load()
    }

    /// Walk the monitored set and write a brand-new baseline, replacing any
    /// existing one.
    pub fn initialize(&self) -> Result<Baseline> {
        let snap = self.capture(&CancellationToken::new())?;
        let baseline = self.baseline_from(snap, None);
        self.store.save(&baseline)?;
        self.metrics.set_files_monitored(baseline.len());

        info!(
            records = baseline.len(),
            unreadable = baseline.unreadable_count(),
            "baseline initialized"
        );
        Ok(baseline)
    }

    /// Compare current disk state against `baseline`. Read-only: the stored
    /// baseline is never touched.
    pub fn scan_once(&self, baseline: &Baseline, cancel: &CancellationToken) -> Result<ScanReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let snap = walk::snapshot(&self.set, cancel)?;
        Ok(self.report(baseline, &snap, started_at, clock))
    }

    /// Fold current state into a new baseline.
    ///
    /// Records the walk could not see (unavailable roots, unlistable
    /// directories) are carried over from the previous baseline instead of
    /// being dropped.
    pub fn accept_baseline(&self) -> Result<Acceptance> {
        let previous = self.store.load()?;
        let started_at = Utc::now();
        let clock = Instant::now();
        let snap = self.capture(&CancellationToken::new())?;
        let accepted = self.report(&previous, &snap, started_at, clock);
        let baseline = self.baseline_from(snap, Some(&previous));
        self.store.save(&baseline)?;
        self.metrics.set_files_monitored(baseline.len());

        info!(
            accepted = accepted.summary.total_changes(),
            records = baseline.len(),
            "current state accepted as baseline"
        );
        Ok(Acceptance { baseline, accepted })
    }

    /// Push a scan's results to the log, the event sink, the report file and
    /// the metrics registry.
    pub fn publish(&self, report: &ScanReport) -> Result<()> {
        for event in &report.events {
            warn!(
                path = %event.path,
                kind = %event.kind,
                severity = %event.severity,
                detail = event.detail.as_deref().unwrap_or(""),
                "integrity change detected"
            );
        }

        let summary = &report.summary;
        let changes = summary.total_changes();
        if self.config.alert_threshold > 0 && changes >= self.config.alert_threshold {
            error!(changes, "FIM alert: {changes} file changes detected");
        }

        self.events.append(&report.events)?;
        if let Some(path) = &self.config.report_file {
            sink::write_report(path, report)?;
        }
        self.metrics.observe_scan(report);

        info!(
            files = summary.files_tracked,
            visited = summary.paths_visited,
            changes,
            read_errors = summary.read_errors,
            duration_secs = summary.duration_secs,
            "scan completed"
        );
        Ok(())
    }

    /// Scan on a fixed interval until `cancel` fires.
    ///
    /// The baseline is re-read at the start of every cycle, so an
    /// acceptance performed by a separate invocation is picked up on the next
    /// cycle. New configurations arriving on `reloads` take effect between
    /// scans. Scans never overlap: ticks that fire while a scan is running
    /// are skipped and counted.
    ///
    /// # Errors
    ///
    /// Structural errors (baseline missing or corrupt, unwritable sinks) end
    /// the loop; cancellation is a clean exit.
    pub async fn run_forever(
        mut self,
        cancel: CancellationToken,
        mut reloads: mpsc::Receiver<AgentConfig>,
    ) -> Result<()> {
        let mut ticker = self.ticker();
        info!(
            interval_secs = self.config.scan_interval_seconds,
            roots = self.set.roots().len(),
            "scan loop started"
        );

        loop {
            let wake = tokio::select! {
                biased;
                () = cancel.cancelled() => Wake::Shutdown,
                Some(config) = reloads.recv() => Wake::Reload(Box::new(config)),
                _ = ticker.tick() => Wake::Tick,
            };
            match wake {
                Wake::Shutdown => break,
                Wake::Reload(config) => {
                    self.reconfigure(*config, &mut ticker);
                    continue;
                }
                Wake::Tick => {}
            }

            match self.run_cycle(&cancel).await {
                Ok(elapsed) => self.note_overrun(elapsed),
                Err(e) if e.is_cancelled() => {
                    info!("scan interrupted by shutdown; results discarded");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "scan cycle failed");
                    return Err(e);
                }
            }
        }

        info!("scan loop stopped");
        Ok(())
    }

    /// One cycle on the blocking pool: load baseline, scan, publish.
    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<Duration> {
        let agent = self.clone();
        let token = cancel.clone();
        let clock = Instant::now();

        tokio::task::spawn_blocking(move || {
            let baseline = agent.store.load()?;
            let report = agent.scan_once(&baseline, &token)?;
            agent.publish(&report)
        })
        .await
        .map_err(|e| FimError::Internal(format!("scan task failed: {e}")))??;

        Ok(clock.elapsed())
    }

    fn note_overrun(&self, elapsed: Duration) {
        let period = self.config.scan_interval().as_millis().max(1);
        let missed = u64::try_from(elapsed.as_millis() / period).unwrap_or(u64::MAX);
        if missed > 0 {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                skipped = missed,
                "scan overran interval; skipping ticks"
            );
            self.metrics.scans_skipped(missed);
        }
    }

    fn reconfigure(&mut self, config: AgentConfig, ticker: &mut Interval) {
        let interval_changed = config.scan_interval_seconds != self.config.scan_interval_seconds;
        match Self::new(config, self.metrics.clone()) {
            Ok(agent) => {
                *self = agent;
                if interval_changed {
                    *ticker = self.ticker();
                }
                info!(
                    roots = self.set.roots().len(),
                    interval_secs = self.config.scan_interval_seconds,
                    "configuration reloaded"
                );
            }
            Err(e) => warn!(error = %e, "rejected configuration reload; keeping previous"),
        }
    }

    fn ticker(&self) -> Interval {
        let period = self.config.scan_interval();
        let start = if self.config.scan_on_start {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Walk for baseline purposes; fails if no root at all is accessible.
    fn capture(&self, cancel: &CancellationToken) -> Result<Snapshot> {
        let snap = walk::snapshot(&self.set, cancel)?;
        if snap.unavailable_roots.len() == self.set.roots().len() {
            return Err(FimError::Config(
                "no monitored root is accessible".into(),
            ));
        }
        Ok(snap)
    }

    fn report(
        &self,
        baseline: &Baseline,
        snap: &Snapshot,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
    ) -> ScanReport {
        let ctx = DiffContext {
            set: &self.set,
            policy: &self.policy,
            timestamp: started_at,
            host: &self.host,
        };
        let events = diff::compare(baseline, snap, &ctx);

        let mut summary = ScanSummary::new(started_at, self.set.roots().len());
        for event in &events {
            summary.record(event.kind);
        }
        summary.paths_visited = snap.paths_visited;
        summary.files_tracked = snap.records.len();
        summary.read_errors = snap.read_errors();
        summary.unavailable_roots = snap
            .unavailable_roots
            .iter()
            .map(|o| path_key::encode(&o.path))
            .collect();
        summary.duration_secs = clock.elapsed().as_secs_f64();

        ScanReport { summary, events }
    }

    fn baseline_from(&self, snap: Snapshot, previous: Option<&Baseline>) -> Baseline {
        let mut records: BTreeMap<_, _> = snap.records.clone();
        if let Some(previous) = previous {
            for (path, record) in &previous.records {
                let p = path_key::decode(path);
                let unseen =
                    snap.unavailable_root_of(&p).is_some() || snap.blind_spot_of(&p).is_some();
                if unseen && self.set.covers(&p) && !records.contains_key(path) {
                    records.insert(path.clone(), record.clone());
                }
            }
        }
        Baseline::new(
            self.host.clone(),
            self.config.digest_algorithm,
            self.set.root_strings(),
            records,
        )
    }
}

/// Hostname stamped on baselines and events.
fn local_host() -> String {
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}
