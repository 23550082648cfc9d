//! Severity labelling for alert routing.

use fim_core::{ChangeKind, Severity};
use std::path::{Path, PathBuf};

/// Assigns a severity to each change based on kind and path.
///
/// - `UNREADABLE`, `ROOT_UNAVAILABLE`: HIGH (loss of visibility)
/// - `MODIFIED`, `DELETED`, `PERMISSION_CHANGED` on a critical path: HIGH
/// - everything else: MEDIUM
#[derive(Debug, Clone, Default)]
pub struct SeverityPolicy {
    critical: Vec<PathBuf>,
}

impl SeverityPolicy {
    #[must_use]
    pub const fn new(critical: Vec<PathBuf>) -> Self {
        Self { critical }
    }

    /// A path is critical if it is, or lies under, a configured critical path.
    pub fn is_critical(&self, path: &Path) -> bool {
        self.critical.iter().any(|c| path.starts_with(c))
    }

    pub fn classify(&self, kind: ChangeKind, path: &Path) -> Severity {
        match kind {
            ChangeKind::Unreadable | ChangeKind::RootUnavailable => Severity::High,
            ChangeKind::Modified | ChangeKind::Deleted | ChangeKind::PermissionChanged
                if self.is_critical(path) =>
            {
                Severity::High
            }
            _ => Severity::Medium,
        }
    }
}
