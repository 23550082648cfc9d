//! Output formatting for command results.

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use fim_agent::Acceptance;
use fim_core::{Baseline, ChangeEvent, ChangeKind, ScanReport, Severity};
use std::path::Path;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print the result of `--init-baseline`.
pub fn baseline_written(format: OutputFormat, baseline: &Baseline, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "baseline_file": path.display().to_string(),
                "records": baseline.len(),
                "unreadable": baseline.unreadable_count(),
                "roots": baseline.roots,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Pretty => {
            println!("{}", "Baseline initialized".bold().underline());
            println!();
            println!("{}: {}", "File".bold(), path.display());
            println!("{}: {}", "Roots".bold(), baseline.roots.join(", "));
            println!("{}: {}", "Records".bold(), baseline.len());
            let unreadable = baseline.unreadable_count();
            if unreadable > 0 {
                println!("{}: {}", "Unreadable".bold(), unreadable.to_string().yellow());
            }
        }
    }
    Ok(())
}

/// Print the result of `--accept-baseline`.
pub fn baseline_accepted(format: OutputFormat, acceptance: &Acceptance, path: &Path) -> Result<()> {
    let summary = &acceptance.accepted.summary;
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "baseline_file": path.display().to_string(),
                "records": acceptance.baseline.len(),
                "accepted": summary,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Pretty => {
            println!("{}", "Baseline updated".bold().underline());
            println!();
            println!("{}: {}", "File".bold(), path.display());
            println!("{}: {}", "Records".bold(), acceptance.baseline.len());
            println!(
                "{}: {}",
                "Accepted changes".bold(),
                summary.total_changes()
            );
            print_counts(summary);
        }
    }
    Ok(())
}

/// Print the result of `--scan-once`.
pub fn scan_report(format: OutputFormat, report: &ScanReport) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Pretty => {
            let summary = &report.summary;
            println!("{}", "Integrity Scan".bold().underline());
            println!();
            println!(
                "{}: {}",
                "Started".bold(),
                summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("{}: {:.2}s", "Duration".bold(), summary.duration_secs);
            println!("{}: {}", "Files".bold(), summary.files_tracked);
            if summary.read_errors > 0 {
                println!(
                    "{}: {}",
                    "Read errors".bold(),
                    summary.read_errors.to_string().yellow()
                );
            }
            println!();

            if summary.total_changes() == 0 {
                println!("{}", "No changes detected".green());
                return Ok(());
            }

            println!(
                "{} {}",
                summary.total_changes().to_string().red().bold(),
                "changes detected".bold()
            );
            print_counts(summary);
            println!();
            for event in &report.events {
                print_event(event);
            }
        }
    }
    Ok(())
}

fn print_counts(summary: &fim_core::ScanSummary) {
    for kind in ChangeKind::ALL {
        let count = summary.count(kind);
        if count > 0 {
            println!("  {:<20} {}", kind.to_string(), count);
        }
    }
}

fn print_event(event: &ChangeEvent) {
    let detail = event
        .detail
        .as_deref()
        .map(|d| format!(" ({d})").dimmed().to_string())
        .unwrap_or_default();
    println!(
        "  {} {:<18} {}{}",
        severity_badge(event.severity),
        event.kind.to_string(),
        event.path,
        detail
    );
}

fn severity_badge(severity: Severity) -> ColoredString {
    match severity {
        Severity::High => "[HIGH]  ".red().bold(),
        Severity::Medium => "[MEDIUM]".yellow(),
    }
}
