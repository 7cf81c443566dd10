//! CLI output formatting.
//!
//! Each command has a `format_*` function returning display lines and a
//! `print_*` wrapper that writes them to stdout. Format functions are pure,
//! so tests assert on the exact text without capturing stdout. Diagnostics
//! go through `tracing`; this module only renders results.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Inputs
//! 001 index.md (1.2 KB)
//! 002 notes/plan.md (860 B)
//! 003 notes/img/pic.png (48.0 KB)
//!
//! 3 inputs, 2 documents
//! ```
//!
//! ## Export
//!
//! ```text
//! [2/3] notes/plan.md
//!
//! Wrote
//!     notes/plan.html
//!     site-lib/file-tree.json
//! Removed
//!     old.html
//!
//! Exported 1 page, skipped 2 unchanged, 0 failed (incremental)
//! ```

use crate::index::ExportIndex;
use crate::scan::InputFile;
use crate::website::{BuildResult, ProgressEvent};

// ============================================================================
// Helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_output(inputs: &[InputFile]) -> Vec<String> {
    let mut lines = vec!["Inputs".to_string()];
    for (i, input) in inputs.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            input.relative_path,
            format_size(input.size)
        ));
    }
    let documents = inputs.iter().filter(|i| i.is_markdown()).count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(inputs.len(), "input"),
        plural(documents, "document")
    ));
    lines
}

pub fn print_scan_output(inputs: &[InputFile]) {
    for line in format_scan_output(inputs) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

pub fn format_progress_event(event: &ProgressEvent) -> String {
    format!("[{}/{}] {}", event.current, event.total, event.label)
}

/// Written and removed paths followed by a one-line summary.
pub fn format_build_summary(result: &BuildResult) -> Vec<String> {
    let stats = &result.stats;
    if result.cancelled {
        return vec![format!(
            "Cancelled after {}; nothing written",
            plural(stats.generated, "page")
        )];
    }

    let mut lines = Vec::new();
    if !result.write_set.is_empty() {
        lines.push("Wrote".to_string());
        for artifact in &result.write_set {
            lines.push(format!("    {}", artifact.relative_destination_path()));
        }
    }
    if !result.removed.is_empty() {
        lines.push("Removed".to_string());
        for path in &result.removed {
            lines.push(format!("    {}", path));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    let mode = if result.uses_incremental_mode {
        "incremental"
    } else {
        "full"
    };
    lines.push(format!(
        "Exported {}, skipped {} unchanged, {} failed ({})",
        plural(stats.generated, "page"),
        stats.skipped,
        stats.failed,
        mode
    ));
    lines
}

pub fn print_build_summary(result: &BuildResult) {
    for line in format_build_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Index
// ============================================================================

pub fn format_index_summary(index: &ExportIndex) -> Vec<String> {
    if !index.is_complete() {
        return vec!["No previous export".to_string()];
    }
    let mut lines = vec![format!(
        "{}, {}",
        plural(index.entries.len(), "artifact"),
        plural(index.sources.len(), "source")
    )];
    for (path, entry) in &index.entries {
        if entry.sources.is_empty() {
            lines.push(format!("    {} ({})", path, format_size(entry.source_size)));
        } else {
            lines.push(format!(
                "    {} ({}) \u{2190} {}",
                path,
                format_size(entry.source_size),
                entry.sources.join(", ")
            ));
        }
    }
    lines
}

pub fn print_index_summary(index: &ExportIndex) {
    for line in format_index_summary(index) {
        println!("{}", line);
    }
}
