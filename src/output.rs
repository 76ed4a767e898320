//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each generated file is shown by its page first (positional index, title,
//! classification) and its path second, so the report reads as an inventory
//! of the site rather than a file listing. Entries are in output path order,
//! not remote order.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! Pages
//! 001 About Us → _pages/about-us.md
//! 002 Scratch Notes (hidden) → _pages/scratch-notes.md
//! 003 Welcome (home) → index.md
//!
//! Delete
//!     _pages/old-name.md
//!
//! Warnings
//!     skipped: page 1f2e has no title
//!
//! Plan: 3 writes (1 new, 2 updated), 1 delete, 1 skipped
//! ```
//!
//! ## Summary
//!
//! ```text
//! Synced: 3 written (1 new, 2 updated), 1 deleted, 1 skipped
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and do no I/O; `print_*`
//! wrappers write them to stdout. Logging goes to stderr through `tracing`,
//! so this report is the only thing on stdout.

use crate::sync::{SyncPlan, SyncSummary, SyncWarning};
use crate::types::Classification;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn classification_marker(classification: Classification) -> &'static str {
    match classification {
        Classification::Home => " (home)",
        Classification::NavPage => "",
        Classification::HiddenPage => " (hidden)",
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn warning_lines(warnings: &[SyncWarning]) -> Vec<String> {
    if warnings.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Warnings".to_string()];
    lines.extend(warnings.iter().map(|w| format!("{}{}", indent(1), w)));
    lines
}

/// Format a plan: files to write, files to delete, warnings, totals.
pub fn format_plan(plan: &SyncPlan) -> Vec<String> {
    let mut lines = Vec::new();

    if !plan.files.is_empty() {
        lines.push("Pages".to_string());
        for (i, file) in plan.files.values().enumerate() {
            lines.push(format!(
                "{} {}{} \u{2192} {}",
                format_index(i + 1),
                file.title,
                classification_marker(file.classification),
                file.path.display()
            ));
        }
    }

    if !plan.diff.to_delete.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Delete".to_string());
        for path in &plan.diff.to_delete {
            lines.push(format!("{}{}", indent(1), path.display()));
        }
    }

    lines.extend(warning_lines(&plan.warnings));

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Plan: {} ({} new, {} updated), {}, {} skipped",
        plural(plan.diff.to_write.len(), "write", "writes"),
        plan.diff.to_create.len(),
        plan.diff.to_update.len(),
        plural(plan.diff.to_delete.len(), "delete", "deletes"),
        plan.skipped
    ));
    lines
}

/// Print a plan to stdout.
pub fn print_plan(plan: &SyncPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

/// Format the result of an applied run.
pub fn format_summary(summary: &SyncSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Synced: {} written ({} new, {} updated), {} deleted, {} skipped",
        summary.written, summary.created, summary.updated, summary.deleted, summary.skipped
    )];
    lines.extend(warning_lines(&summary.warnings));
    lines
}

/// Print a run summary to stdout.
pub fn print_summary(summary: &SyncSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}
