use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for integrity monitoring operations
pub type Result<T> = std::result::Result<T, FimError>;

/// Structural errors that abort the operation they occur in.
///
/// Per-file problems (permission denied, transient I/O) are not errors; they
/// travel as [`ReadFailure`](crate::ReadFailure) values inside the scan result.
#[derive(Error, Debug)]
pub enum FimError {
    /// Configuration is invalid or missing required fields
    #[error("configuration error: {0}")]
    Config(String),

    /// No baseline has been initialized yet
    #[error("no baseline at {path}; run with --init-baseline first")]
    BaselineMissing {
        /// Expected baseline location
        path: PathBuf,
    },

    /// The baseline file exists but cannot be trusted
    #[error("baseline at {path} is corrupt: {reason}")]
    BaselineCorrupt {
        /// Baseline location
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Filesystem operation on agent-owned state failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metric registration or encoding failed
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Metrics HTTP server failed to bind or serve
    #[error("metrics server error: {0}")]
    Server(String),

    /// The operation observed a shutdown request and stopped early
    #[error("operation cancelled")]
    Cancelled,

    /// Generic internal error (e.g. a scan thread panicked)
    #[error("internal error: {0}")]
    Internal(String),
}

impl FimError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for bad configuration or untrustworthy baseline state.
    ///
    /// These must be surfaced to the supervisor rather than retried.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::BaselineMissing { .. } | Self::BaselineCorrupt { .. }
        )
    }

    /// Returns true if the error only signals a shutdown request
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
