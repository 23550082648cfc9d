//! Output sinks: the NDJSON event log and the latest-scan report file.

use fim_core::{ChangeEvent, FimError, Result, ScanReport};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Append-only newline-delimited JSON event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per event and flush.
    pub fn append(&self, events: &[ChangeEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        ensure_parent(&self.path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FimError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        for event in events {
            serde_json::to_writer(&mut writer, event)?;
            writer
                .write_all(b"\n")
                .map_err(|e| FimError::io(&self.path, e))?;
        }
        writer.flush().map_err(|e| FimError::io(&self.path, e))
    }
}

/// Overwrite `path` atomically with the pretty-printed report.
pub fn write_report(path: &Path, report: &ScanReport) -> Result<()> {
    let dir = ensure_parent(path)?;
    let tmp = NamedTempFile::new_in(&dir).map_err(|e| FimError::io(&dir, e))?;
    serde_json::to_writer_pretty(tmp.as_file(), report)?;
    tmp.persist(path).map_err(|e| FimError::io(path, e.error))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<PathBuf> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    fs::create_dir_all(&dir).map_err(|e| FimError::io(&dir, e))?;
    Ok(dir)
}
