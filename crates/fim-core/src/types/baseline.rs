//! Persisted "known good" snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::FileRecord;

/// Current on-disk baseline format version.
pub const BASELINE_VERSION: u32 = 1;

/// Content digest algorithm. Only 256-bit SHA-2 is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
}

impl DigestAlgorithm {
    /// Length of a hex-encoded digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// A persisted snapshot of monitored file state.
///
/// Records live in a sorted map so the serialized form is stable across
/// runs over identical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub host: String,
    pub digest_algorithm: DigestAlgorithm,
    /// Roots that were walked to build this baseline
    pub roots: Vec<String>,
    pub records: BTreeMap<String, FileRecord>,
}

impl Baseline {
    /// Build a baseline from records keyed by path.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        digest_algorithm: DigestAlgorithm,
        roots: Vec<String>,
        records: BTreeMap<String, FileRecord>,
    ) -> Self {
        Self {
            version: BASELINE_VERSION,
            created_at: Utc::now(),
            host: host.into(),
            digest_algorithm,
            roots,
            records,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Number of records that could not be digested.
    #[must_use]
    pub fn unreadable_count(&self) -> usize {
        self.records.values().filter(|r| !r.is_readable()).count()
    }

    /// Same paths with the same state, ignoring all timestamps of observation.
    #[must_use]
    pub fn same_records(&self, other: &Self) -> bool {
        self.records.len() == other.records.len()
            && self
                .records
                .iter()
                .zip(other.records.iter())
                .all(|((ka, a), (kb, b))| ka == kb && a.same_state(b))
    }

    /// Check internal consistency of a deserialized baseline.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self, expected: DigestAlgorithm) -> std::result::Result<(), String> {
        if self.version != BASELINE_VERSION {
            return Err(format!(
                "unsupported version {} (expected {BASELINE_VERSION})",
                self.version
            ));
        }
        if self.digest_algorithm != expected {
            return Err(format!(
                "digest algorithm {} does not match configured {expected}",
                self.digest_algorithm
            ));
        }
        for (key, record) in &self.records {
            if *key != record.path {
                return Err(format!("record key {key} does not match path {}", record.path));
            }
            if let Some(digest) = &record.content_digest {
                let valid = digest.len() == expected.hex_len()
                    && digest.bytes().all(|b| b.is_ascii_hexdigit());
                if !valid {
                    return Err(format!("malformed digest for {key}"));
                }
            }
        }
        Ok(())
    }
}
