//! Core types for the file integrity monitoring agent.
//!
//! This crate holds the data model shared by the engine and the binary:
//!
//! - **Records**: [`FileRecord`] describes one tracked filesystem object
//! - **Baselines**: [`Baseline`] is the persisted "known good" snapshot
//! - **Events**: [`ChangeEvent`] is one detected deviation from the baseline
//! - **Summaries**: [`ScanSummary`] aggregates one scan cycle
//! - **Errors**: structural failures via [`FimError`]
//! - **Keys**: [`path_key`] maps raw path bytes to record keys and back
//!
//! # Example
//!
//! ```rust,ignore
//! use fim_core::{ChangeKind, ScanSummary};
//!
//! fn report(summary: &ScanSummary) {
//!     println!("new={} deleted={}", summary.count(ChangeKind::New), summary.deleted);
//! }
//! ```

mod error;
pub mod path_key;
pub mod types;

pub use error::{FimError, Result};
pub use types::*;
