//! Domain types shared across the agent.

pub mod baseline;
pub mod event;
pub mod record;
pub mod summary;

pub use baseline::{Baseline, DigestAlgorithm, BASELINE_VERSION};
pub use event::{ChangeEvent, ChangeKind, Severity};
pub use record::{EntryKind, FileRecord, ReadFailure, ReadFailureKind};
pub use summary::{ScanReport, ScanSummary};
