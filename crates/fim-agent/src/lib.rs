//! # fim-agent
//!
//! File integrity baseline engine.
//!
//! Keeps a trustworthy record of "known good" file state and reports
//! deviations from it on a schedule. Detected changes are never folded back
//! into the baseline automatically; an operator has to accept them.
//!
//! ## Data Flow
//!
//! ```text
//! Initialize:
//!   MonitoredSet -> walk::snapshot() -> Baseline -> BaselineStore::save()
//!
//! Scan cycle (read-only against the baseline):
//!   BaselineStore::load() + walk::snapshot()
//!   -> diff::compare() -> ScanReport { summary, events }
//!   -> EventLog (NDJSON) + report file + AgentMetrics
//!
//! Scrape (concurrent, never triggers a scan):
//!   GET /metrics -> AgentMetrics::encode_text()
//! ```

pub mod agent;
pub mod config;
pub mod diff;
pub mod hash;
pub mod metrics;
pub mod monitor;
pub mod server;
pub mod severity;
pub mod sink;
pub mod store;
pub mod walk;

pub use agent::{Acceptance, Agent};
pub use config::AgentConfig;
pub use fim_core::{FimError, Result};
pub use metrics::{AgentMetrics, SharedMetrics};
pub use monitor::MonitoredSet;
