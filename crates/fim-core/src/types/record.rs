//! Per-path file records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;

/// What kind of filesystem object a record describes.
///
/// Directories are traversed but never recorded; special files
/// (sockets, FIFOs, devices) are never recorded either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file, digest covers its contents
    File,
    /// Symbolic link, digest covers the link target path
    Symlink,
}

/// Why a file's content could not be digested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFailureKind {
    /// Open or read returned EACCES/EPERM
    PermissionDenied,
    /// Any other I/O failure
    Io,
}

/// A per-file read failure, recorded instead of a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFailure {
    pub kind: ReadFailureKind,
    pub message: String,
}

impl ReadFailure {
    /// Classify an I/O error from opening or reading a file.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => ReadFailureKind::PermissionDenied,
            _ => ReadFailureKind::Io,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// One tracked filesystem object.
///
/// A record with `content_digest: None` existed but could not be read. It is
/// never equal in content to any other record, readable or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path as a [`crate::path_key`] key, unique within a baseline
    pub path: String,
    /// Regular file or symlink
    pub entry: EntryKind,
    /// Lowercase hex SHA-256 of the contents (or link target)
    pub content_digest: Option<String>,
    /// Byte length from stat
    pub size: u64,
    /// Permission bits (`st_mode & 0o7777`)
    pub mode: u32,
    /// Owning uid
    pub owner: u32,
    /// Owning gid
    pub group: u32,
    /// Last modification time reported by the filesystem
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    /// When this record was taken
    pub observed_at: DateTime<Utc>,
    /// Set when the contents could not be digested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_error: Option<ReadFailure>,
}

impl FileRecord {
    /// Whether the contents were successfully digested
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.content_digest.is_some()
    }

    /// Both records were digested and the digests match.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (&self.content_digest, &other.content_digest) {
            (Some(a), Some(b)) => a == b && self.entry == other.entry,
            _ => false,
        }
    }

    /// Mode, owner and group all match.
    #[must_use]
    pub const fn same_permissions(&self, other: &Self) -> bool {
        self.mode == other.mode && self.owner == other.owner && self.group == other.group
    }

    /// Everything except `observed_at` matches.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        self.path == other.path
            && self.entry == other.entry
            && self.content_digest == other.content_digest
            && self.size == other.size
            && self.same_permissions(other)
            && self.mtime == other.mtime
            && self.read_error == other.read_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(digest: Option<&str>) -> FileRecord {
        FileRecord {
            path: "/etc/hosts".into(),
            entry: EntryKind::File,
            content_digest: digest.map(String::from),
            size: 12,
            mode: 0o644,
            owner: 0,
            group: 0,
            mtime: None,
            observed_at: Utc::now(),
            read_error: None,
        }
    }

    #[test]
    fn test_unreadable_never_same_content() {
        let unreadable = record(None);
        assert!(!unreadable.same_content(&unreadable.clone()));
        assert!(!unreadable.same_content(&record(Some("ab"))));
        assert!(record(Some("ab")).same_content(&record(Some("ab"))));
    }

    #[test]
    fn test_same_state_ignores_observed_at() {
        let a = record(Some("ab"));
        let mut b = a.clone();
        b.observed_at = a.observed_at + chrono::Duration::seconds(30);
        assert!(a.same_state(&b));
        b.mode = 0o600;
        assert!(!a.same_state(&b));
    }

    #[test]
    fn test_read_failure_classification() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            ReadFailure::from_io(&denied).kind,
            ReadFailureKind::PermissionDenied
        );
        let other = io::Error::new(io::ErrorKind::Other, "bad sector");
        assert_eq!(ReadFailure::from_io(&other).kind, ReadFailureKind::Io);
    }

    #[test]
    fn test_readable_record_omits_read_error_field() {
        let json = serde_json::to_string(&record(Some("ab"))).unwrap();
        assert!(!json.contains("read_error"));
        assert!(json.contains("\"entry\":\"file\""));
    }
}
