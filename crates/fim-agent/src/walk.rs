//! Filesystem walk: turn the monitored set into a map of current records.

use chrono::{DateTime, Utc};
use fim_core::{path_key, EntryKind, FileRecord, FimError, ReadFailure, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::hash::{sha256_bytes, sha256_file};
use crate::monitor::MonitoredSet;

/// A path the walk could not see into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstruction {
    pub path: PathBuf,
    pub reason: String,
}

/// Current state of the monitored set, built fresh for every scan.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub records: BTreeMap<String, FileRecord>,
    /// Roots that are missing or could not be listed at all
    pub unavailable_roots: Vec<Obstruction>,
    /// Directories (or entries) below a root that could not be read
    pub blind_spots: Vec<Obstruction>,
    pub paths_visited: u64,
}

impl Snapshot {
    /// Unreadable files plus every obstruction.
    pub fn read_errors(&self) -> u64 {
        let unreadable = self.records.values().filter(|r| !r.is_readable()).count();
        (unreadable + self.unavailable_roots.len() + self.blind_spots.len()) as u64
    }

    /// The unavailable root containing `path`, if any.
    pub fn unavailable_root_of(&self, path: &Path) -> Option<&Obstruction> {
        self.unavailable_roots.iter().find(|o| path.starts_with(&o.path))
    }

    /// The blind spot containing `path`, if any.
    pub fn blind_spot_of(&self, path: &Path) -> Option<&Obstruction> {
        self.blind_spots.iter().find(|o| path.starts_with(&o.path))
    }
}

/// Walk every root and record regular files and symlinks.
///
/// Symlinks are never followed. Directories are traversed but not recorded;
/// sockets, FIFOs and devices are skipped. The token is checked before every
/// entry, so cancellation never interrupts a digest in progress. Every
/// record is stamped with the time the walk started.
///
/// # Errors
///
/// Only `FimError::Cancelled`; everything else is captured in the snapshot.
pub fn snapshot(set: &MonitoredSet, cancel: &CancellationToken) -> Result<Snapshot> {
    let mut snap = Snapshot::default();
    let observed_at = Utc::now();

    for root in set.roots() {
        if cancel.is_cancelled() {
            return Err(FimError::Cancelled);
        }
        if set.is_excluded(root) {
            debug!(root = %root.display(), "root is excluded, skipping");
            continue;
        }
        if let Err(e) = probe_root(root) {
            warn!(root = %root.display(), error = %e, "monitored root unavailable");
            snap.unavailable_roots.push(Obstruction {
                path: root.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        walk_root(set, root, observed_at, cancel, &mut snap)?;
    }

    Ok(snap)
}

/// A root is available if it can be stat'ed and, for directories, listed.
fn probe_root(root: &Path) -> io::Result<()> {
    let meta = fs::metadata(root)?;
    if meta.is_dir() {
        fs::read_dir(root)?;
    }
    Ok(())
}

fn walk_root(
    set: &MonitoredSet,
    root: &Path,
    observed_at: DateTime<Utc>,
    cancel: &CancellationToken,
    snap: &mut Snapshot,
) -> Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !set.is_excluded(e.path()));

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(FimError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let vanished = err
                    .io_error()
                    .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
                if vanished {
                    continue;
                }
                let path = err.path().unwrap_or(root).to_path_buf();
                let obstruction = Obstruction {
                    path,
                    reason: err.to_string(),
                };
                if err.depth() == 0 {
                    warn!(root = %root.display(), error = %err, "monitored root unavailable");
                    snap.unavailable_roots.push(obstruction);
                } else {
                    warn!(path = %obstruction.path.display(), error = %err, "cannot read directory entry");
                    snap.blind_spots.push(obstruction);
                }
                continue;
            }
        };

        snap.paths_visited += 1;
        match observe(&entry, observed_at) {
            Observation::Recorded(record) => {
                snap.records.insert(record.path.clone(), *record);
            }
            Observation::Obstructed(obstruction) => snap.blind_spots.push(obstruction),
            Observation::Skipped => {}
        }
    }

    Ok(())
}

/// Outcome of looking at one directory entry.
enum Observation {
    Recorded(Box<FileRecord>),
    /// Could not even stat it
    Obstructed(Obstruction),
    /// Directory, special file, or vanished before it could be read
    Skipped,
}

fn observe(entry: &DirEntry, observed_at: DateTime<Utc>) -> Observation {
    let file_type = entry.file_type();
    let path = entry.path();

    let entry_kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        if !file_type.is_dir() {
            debug!(path = %path.display(), "skipping special file");
        }
        return Observation::Skipped;
    };

    let meta = match entry.metadata() {
        Ok(meta) => meta,
        Err(err) => {
            let vanished = err
                .io_error()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
            if vanished {
                return Observation::Skipped;
            }
            warn!(path = %path.display(), error = %err, "cannot stat file");
            return Observation::Obstructed(Obstruction {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
        }
    };

    let digest = match entry_kind {
        EntryKind::File => sha256_file(path),
        EntryKind::Symlink => {
            fs::read_link(path).map(|target| sha256_bytes(target.as_os_str().as_bytes()))
        }
    };

    let (content_digest, read_error) = match digest {
        Ok(digest) => (Some(digest), None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Observation::Skipped,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read file contents");
            (None, Some(ReadFailure::from_io(&e)))
        }
    };

    Observation::Recorded(Box::new(FileRecord {
        path: path_key::encode(path),
        entry: entry_kind,
        content_digest,
        size: meta.len(),
        mode: meta.mode() & 0o7777,
        owner: meta.uid(),
        group: meta.gid(),
        mtime: meta.modified().ok().map(DateTime::<Utc>::from),
        observed_at,
        read_error,
    }))
}
