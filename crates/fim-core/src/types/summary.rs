//! Per-scan aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{ChangeEvent, ChangeKind};

/// Aggregate statistics for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Number of configured roots
    pub roots: usize,
    /// Directory entries visited during the walk
    pub paths_visited: u64,
    /// Records in the current state map
    pub files_tracked: usize,
    /// Unreadable files, unlistable directories and unavailable roots
    pub read_errors: u64,
    pub new: usize,
    pub modified: usize,
    pub deleted: usize,
    pub permission_changed: usize,
    pub unreadable: usize,
    pub root_unavailable: usize,
    /// Roots that could not be scanned at all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_roots: Vec<String>,
}

impl ScanSummary {
    /// Empty summary for a scan starting at `started_at`.
    #[must_use]
    pub const fn new(started_at: DateTime<Utc>, roots: usize) -> Self {
        Self {
            started_at,
            duration_secs: 0.0,
            roots,
            paths_visited: 0,
            files_tracked: 0,
            read_errors: 0,
            new: 0,
            modified: 0,
            deleted: 0,
            permission_changed: 0,
            unreadable: 0,
            root_unavailable: 0,
            unavailable_roots: Vec::new(),
        }
    }

    /// Count one event of `kind`.
    pub fn record(&mut self, kind: ChangeKind) {
        *self.slot(kind) += 1;
    }

    /// Number of events of `kind`.
    #[must_use]
    pub const fn count(&self, kind: ChangeKind) -> usize {
        match kind {
            ChangeKind::New => self.new,
            ChangeKind::Modified => self.modified,
            ChangeKind::Deleted => self.deleted,
            ChangeKind::PermissionChanged => self.permission_changed,
            ChangeKind::Unreadable => self.unreadable,
            ChangeKind::RootUnavailable => self.root_unavailable,
        }
    }

    fn slot(&mut self, kind: ChangeKind) -> &mut usize {
        match kind {
            ChangeKind::New => &mut self.new,
            ChangeKind::Modified => &mut self.modified,
            ChangeKind::Deleted => &mut self.deleted,
            ChangeKind::PermissionChanged => &mut self.permission_changed,
            ChangeKind::Unreadable => &mut self.unreadable,
            ChangeKind::RootUnavailable => &mut self.root_unavailable,
        }
    }

    /// Total events across all kinds.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        ChangeKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    /// No events and no read errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total_changes() == 0 && self.read_errors == 0
    }
}

/// Everything one scan produced: the summary plus path-ordered events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub events: Vec<ChangeEvent>,
}
