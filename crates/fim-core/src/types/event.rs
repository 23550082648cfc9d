//! Change events emitted by a scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a detected difference.
///
/// The declaration order is the tie-break order for events on the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// Path present now but absent from the baseline
    New,
    /// Digest differs from the baseline
    Modified,
    /// Path in the baseline but gone now
    Deleted,
    /// Same digest, different mode/owner/group
    PermissionChanged,
    /// Was readable in the baseline, cannot be read now
    Unreadable,
    /// A whole monitored root is missing or inaccessible
    RootUnavailable,
}

impl ChangeKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Modified,
        Self::Deleted,
        Self::PermissionChanged,
        Self::Unreadable,
        Self::RootUnavailable,
    ];

    /// Lowercase label used for metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::PermissionChanged => "permission_changed",
            Self::Unreadable => "unreadable",
            Self::RootUnavailable => "root_unavailable",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::PermissionChanged => "PERMISSION_CHANGED",
            Self::Unreadable => "UNREADABLE",
            Self::RootUnavailable => "ROOT_UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Alert routing label attached to each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    /// Lowercase label used for metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medium => f.write_str("MEDIUM"),
            Self::High => f.write_str("HIGH"),
        }
    }
}

/// One detected deviation between current state and the baseline.
///
/// Events are facts: once emitted they are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Start time of the scan that detected the change
    pub timestamp: DateTime<Utc>,
    /// Host the agent runs on
    #[serde(default)]
    pub host: String,
    /// Encoded with [`crate::path_key`]
    pub path: String,
    pub kind: ChangeKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_digest: Option<String>,
    /// Free-form context, e.g. the read error or the mode change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ChangeEvent {
    /// Identity of the event without its timestamp or host.
    ///
    /// Two scans of identical state yield identical keys in identical order.
    #[must_use]
    pub fn key(&self) -> (&str, ChangeKind, Option<&str>, Option<&str>) {
        (
            &self.path,
            self.kind,
            self.previous_digest.as_deref(),
            self.current_digest.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_string(&ChangeKind::PermissionChanged).unwrap();
        assert_eq!(json, "\"PERMISSION_CHANGED\"");
        let parsed: ChangeKind = serde_json::from_str("\"ROOT_UNAVAILABLE\"").unwrap();
        assert_eq!(parsed, ChangeKind::RootUnavailable);
        assert_eq!(ChangeKind::PermissionChanged.to_string(), "PERMISSION_CHANGED");
    }

    #[test]
    fn test_event_json_skips_absent_digests() {
        let event = ChangeEvent {
            timestamp: Utc::now(),
            host: "lab1".into(),
            path: "/etc/passwd".into(),
            kind: ChangeKind::Deleted,
            severity: Severity::High,
            previous_digest: Some("abc".into()),
            current_digest: None,
            detail: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"DELETED\""));
        assert!(json.contains("\"severity\":\"HIGH\""));
        assert!(!json.contains("current_digest"));
        assert!(!json.contains('\n'));
    }
}
