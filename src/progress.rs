//! Progress reporting for the bulk sync
//!
//! Provides a spinner for the parallel phase and styled header/summary
//! output around each pull cycle.

use crate::sync::CycleReport;
use indicatif::{ProgressBar, ProgressStyle};
use console::style;
use std::time::Duration;

/// Spinner shown while a pull cycle runs
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a run
pub fn print_header(config: &str, workers: usize, targets: usize) {
    println!();
    println!(
        "{} {}",
        style("bulksync").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Config:").bold(), config);
    println!("  {} {}", style("Targets:").bold(), targets);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

/// Print a summary after one pull cycle
pub fn print_summary(index: &str, report: &CycleReport) {
    let duration_secs = report.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        report.documents_indexed as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{} {}", style("Synced").green().bold(), index);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Tasks:").bold(),
        format_number(report.tasks as u64)
    );
    println!("  {} {}", style("Rows:").bold(), format_number(report.rows));
    println!(
        "  {} {}",
        style("Documents:").bold(),
        format_number(report.documents_indexed)
    );
    if report.replayed > 0 {
        println!(
            "  {} {}",
            style("Replayed:").yellow().bold(),
            format_number(report.replayed)
        );
    }
    println!(
        "  {} ({}, {}]",
        style("Window:").bold(),
        report.txmin,
        report.txmax
    );
    println!(
        "  {} {:.1}s ({:.0} docs/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    println!();
}
