//! Baseline persistence: validated loads and atomic replacement.

use fim_core::{Baseline, DigestAlgorithm, FimError, Result};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Single-writer handle to the on-disk baseline.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
    algorithm: DigestAlgorithm,
}

impl BaselineStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, algorithm: DigestAlgorithm) -> Self {
        Self {
            path: path.into(),
            algorithm,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate the baseline.
    ///
    /// A missing file is `BaselineMissing`, never an empty baseline: treating
    /// "no baseline" as "everything is new" would flood false positives.
    pub fn load(&self) -> Result<Baseline> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FimError::BaselineMissing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(FimError::io(&self.path, e)),
        };

        let baseline: Baseline =
            serde_json::from_slice(&content).map_err(|e| self.corrupt(e.to_string()))?;
        baseline
            .validate(self.algorithm)
            .map_err(|reason| self.corrupt(reason))?;

        debug!(
            path = %self.path.display(),
            records = baseline.len(),
            "loaded baseline"
        );
        Ok(baseline)
    }

    /// Replace the baseline atomically: write a sibling temp file, fsync,
    /// then rename over the old one. A crash leaves the previous file intact.
    pub fn save(&self, baseline: &Baseline) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| FimError::io(dir, e))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| FimError::io(dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, baseline)?;
            writer
                .write_all(b"\n")
                .and_then(|()| writer.flush())
                .map_err(|e| FimError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| FimError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| FimError::io(&self.path, e.error))?;

        info!(
            path = %self.path.display(),
            records = baseline.len(),
            "baseline written"
        );
        Ok(())
    }

    fn corrupt(&self, reason: String) -> FimError {
        FimError::BaselineCorrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
