//! Progress reporting for scans
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::scanner::{ScanProgress, ScanSummary};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Longest current-path suffix shown next to the counters
const MAX_PATH_CHARS: usize = 60;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Rate: {:.0} dirs/s | Pending: {} | {}",
            format_number(progress.dirs_scanned),
            format_number(progress.files_recorded),
            format_size(progress.bytes_allocated, BINARY),
            progress.dirs_per_second(),
            progress.outstanding,
            trim_path(&progress.current_path),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
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

/// Keep the tail of long paths
fn trim_path(path: &Path) -> String {
    let text = path.display().to_string();
    let count = text.chars().count();
    if count <= MAX_PATH_CHARS {
        return text;
    }
    let tail: String = text.chars().skip(count - (MAX_PATH_CHARS - 3)).collect();
    format!("...{}", tail)
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

/// Print a summary of the scan results
pub fn print_summary(summary: &ScanSummary, db_path: &Path, db_size: Option<u64>) {
    let duration_secs = summary.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        summary.dirs_scanned as f64 / duration_secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("{}", style("Scan Complete").green().bold());
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(summary.dirs_scanned)
    );
    eprintln!("  {} {}", style("Files:").bold(), format_number(summary.files_recorded));
    eprintln!(
        "  {} {} ({} apparent)",
        style("Allocated:").bold(),
        format_size(summary.bytes_allocated, BINARY),
        format_size(summary.bytes_apparent, BINARY)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} dirs/sec, {} batches)",
        style("Duration:").bold(),
        duration_secs,
        rate,
        summary.batches
    );
    if summary.dirs_excluded > 0 {
        eprintln!(
            "  {} {}",
            style("Excluded:").bold(),
            format_number(summary.dirs_excluded)
        );
    }
    if summary.dirs_skipped_permission > 0 {
        eprintln!(
            "  {} {}",
            style("Permission denied:").yellow().bold(),
            format_number(summary.dirs_skipped_permission)
        );
    }
    match db_size {
        Some(size) => eprintln!(
            "  {} {} ({})",
            style("Database:").bold(),
            db_path.display(),
            format_size(size, BINARY)
        ),
        None => eprintln!("  {} {}", style("Database:").bold(), db_path.display()),
    }
    eprintln!();
}

/// Print a header at the start of the scan
pub fn print_header(root: &Path, workers: usize, output: &Path) {
    eprintln!();
    eprintln!("{} {}", style("fdu").cyan().bold(), env!("CARGO_PKG_VERSION"));
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Source:").bold(), root.display());
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!("  {} {}", style("Output:").bold(), output.display());
    eprintln!();
}
