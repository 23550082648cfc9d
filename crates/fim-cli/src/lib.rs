//! # fim-cli
//!
//! The `fim-agent` binary: argument parsing, logging setup, signal handling
//! and mode dispatch on top of the `fim-agent` engine.
//!
//! ## Modes
//!
//! - **Continuous** (default): scan on an interval, serve `/metrics`
//! - **`--init-baseline`**: record current state as the baseline
//! - **`--accept-baseline`**: fold current state into the existing baseline
//! - **`--scan-once`**: one comparison, summary on stdout

pub mod cli;
pub mod logging;
pub mod output;

pub use cli::run;
