//! Progress reporting for the wipe run
//!
//! Provides a live spinner during the run plus the header and summary
//! printed around it. Nothing here is used in silent mode.

use crate::report::CompletedReport;
use crate::walker::{WipeProgress, WipeResult};
use crate::wipe::WipeMethod;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays wipe status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let spinner = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WipeProgress) {
        let msg = format!(
            "Found: {} | Wiped: {} | Failed: {} | Written: {} | Rate: {:.0}/s | Queue: {} | Workers: {}",
            format_number(progress.files_seen),
            format_number(progress.wiped),
            format_number(progress.failed),
            format_size(progress.bytes_overwritten, BINARY),
            progress.files_per_second(),
            progress.queue_size,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(targets: &str, method: WipeMethod, passes: u32, workers: usize) {
    println!();
    println!(
        "{} {}",
        style("dirshred").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Targets:").bold(), targets);
    println!("  {} {} ({} passes)", style("Method:").bold(), method, passes);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!();
}

/// Print a summary of the run
///
/// `result` is absent when the run stopped with a run-level error; the
/// report totals are still printed since they are what matters.
pub fn print_summary(report: &CompletedReport, result: Option<&WipeResult>, report_path: Option<&Path>) {
    let duration = report.elapsed();
    let duration_secs = duration.as_secs_f64();
    let processed = report.success_count + report.error_count;
    let rate = if duration_secs > 0.0 {
        processed as f64 / duration_secs
    } else {
        0.0
    };

    let title = match result {
        Some(r) if !r.completed => style("Wipe Interrupted").yellow().bold(),
        Some(_) if report.passed() => style("Wipe Complete").green().bold(),
        _ => style("Wipe Finished With Errors").red().bold(),
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Wiped:").bold(),
        format_number(report.success_count)
    );
    if let Some(result) = result {
        println!(
            "  {} {}",
            style("Overwritten:").bold(),
            format_size(result.bytes_overwritten, BINARY)
        );
        println!(
            "  {} {}",
            style("Roots removed:").bold(),
            result.roots_removed
        );
    }
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if report.error_count > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(report.error_count)
        );
    }
    if let Some(path) = report_path {
        println!("  {} {}", style("Report:").bold(), path.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}
