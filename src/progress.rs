//! Progress reporting for mirror runs
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::walker::{MirrorProgress, MirrorReport};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Failures listed individually in the summary before truncating
const MAX_LISTED_FAILURES: usize = 20;

/// Progress reporter that displays run status
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &MirrorProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Strm: {} | Copied: {} ({}) | Failed: {} | Rate: {:.0}/s | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.files),
            format_number(progress.pointers),
            format_number(progress.copies),
            format_size(progress.bytes, BINARY),
            format_number(progress.failed),
            progress.files_per_second(),
            progress.active_workers,
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
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    HumanCount(n).to_string()
}

/// Print a summary of the run
pub fn print_summary(report: &MirrorReport, local_root: &str) {
    let duration_secs = report.duration.as_secs_f64();

    let title = if report.is_success() {
        style("Mirror Complete").green().bold()
    } else {
        style("Mirror Finished With Errors").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Directories:").bold(), format_number(report.total_dirs));
    println!("  {} {}", style("Files seen:").bold(), format_number(report.total_files));
    println!("  {} {}", style("Pointers:").bold(), format_number(report.pointers_written));
    println!(
        "  {} {} ({})",
        style("Copied:").bold(),
        format_number(report.files_copied),
        format_size(report.bytes_copied, BINARY)
    );
    println!("  {} {}", style("Ignored:").bold(), format_number(report.ignored));
    if report.excluded > 0 {
        println!("  {} {}", style("Excluded:").bold(), format_number(report.excluded));
    }
    println!(
        "  {} {:.1}s (peak {} workers)",
        style("Duration:").bold(),
        duration_secs,
        report.peak_workers
    );
    println!("  {} {}", style("Output:").bold(), local_root);

    if let Some(e) = &report.walk_error {
        println!("  {} {}", style("Walk aborted:").red().bold(), e);
    }

    if !report.failures.is_empty() {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(report.failures.len() as u64)
        );
        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            println!("    {} {}", style("-").dim(), failure);
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            println!(
                "    {} and {} more",
                style("…").dim(),
                report.failures.len() - MAX_LISTED_FAILURES
            );
        }
    }
    println!();
}

/// Print a header at the start of the run
pub fn print_header(url: &str, remote_root: &str, workers: usize, output: &str) {
    println!();
    println!(
        "{} {}",
        style("strm-mirror").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), url);
    println!("  {} {}", style("Remote root:").bold(), remote_root);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}
