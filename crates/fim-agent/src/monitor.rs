//! The monitored set: roots to walk and rules for what to skip.

use fim_core::{path_key, FimError, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};

use crate::config::AgentConfig;

/// Pseudo filesystems that are never walked, whatever the configuration says.
pub const PSEUDO_FILESYSTEMS: &[&str] = &["/proc", "/sys", "/dev", "/run"];

/// One exclusion pattern.
///
/// - contains `*`, `?` or `[` and a `/`: glob against the full path
/// - contains glob characters but no `/`: glob against the file name
/// - absolute without glob characters: component-wise path prefix
/// - anything else: exact file name (e.g. `.git`)
#[derive(Debug, Clone)]
pub enum ExcludeRule {
    Prefix(PathBuf),
    Name(String),
    PathGlob(Pattern),
    NameGlob(Pattern),
}

impl ExcludeRule {
    /// Parse a configured pattern.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(FimError::Config("empty exclusion pattern".into()));
        }

        let is_glob = pattern.contains(&['*', '?', '['][..]);
        if is_glob {
            let compiled = Pattern::new(pattern).map_err(|e| {
                FimError::Config(format!("invalid exclusion pattern {pattern:?}: {e}"))
            })?;
            if pattern.contains('/') {
                Ok(Self::PathGlob(compiled))
            } else {
                Ok(Self::NameGlob(compiled))
            }
        } else if pattern.starts_with('/') {
            Ok(Self::Prefix(PathBuf::from(pattern)))
        } else {
            Ok(Self::Name(pattern.to_string()))
        }
    }

    /// Whether `path` is excluded by this rule.
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix),
            Self::Name(name) => path
                .file_name()
                .is_some_and(|n| n.to_string_lossy() == name.as_str()),
            Self::PathGlob(pattern) => pattern.matches(&path.to_string_lossy()),
            Self::NameGlob(pattern) => path
                .file_name()
                .is_some_and(|n| pattern.matches(&n.to_string_lossy())),
        }
    }
}

/// Roots plus exclusion rules. Immutable for the duration of a scan.
#[derive(Debug, Clone)]
pub struct MonitoredSet {
    roots: Vec<PathBuf>,
    rules: Vec<ExcludeRule>,
}

impl MonitoredSet {
    /// Build from roots and raw patterns.
    pub fn new(roots: Vec<PathBuf>, patterns: &[String]) -> Result<Self> {
        let mut rules = patterns
            .iter()
            .map(|p| ExcludeRule::parse(p))
            .collect::<Result<Vec<_>>>()?;
        rules.extend(
            PSEUDO_FILESYSTEMS
                .iter()
                .map(|p| ExcludeRule::Prefix(PathBuf::from(p))),
        );
        Ok(Self { roots, rules })
    }

    /// Build from a validated config. Files the agent writes are excluded
    /// so its own output never shows up as a change.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let mut set = Self::new(config.monitored_paths.clone(), &config.excluded_paths)?;
        set.rules
            .extend(config.owned_files().into_iter().map(ExcludeRule::Prefix));
        Ok(set)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Roots as strings, for recording in a baseline.
    pub fn root_strings(&self) -> Vec<String> {
        self.roots.iter().map(|r| path_key::encode(r)).collect()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.rules.iter().any(|rule| rule.matches(path))
    }

    /// The first configured root containing `path`.
    pub fn root_of(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .find(|root| path.starts_with(root))
            .map(PathBuf::as_path)
    }

    /// Under some root, and neither the path nor any directory between it
    /// and that root is excluded. Matches what a walk would reach, since the
    /// walk prunes excluded directories.
    pub fn covers(&self, path: &Path) -> bool {
        let Some(root) = self.root_of(path) else {
            return false;
        };
        if self.is_excluded(root) {
            return false;
        }
        !path
            .ancestors()
            .take_while(|dir| *dir != root)
            .any(|dir| self.is_excluded(dir))
    }
}
