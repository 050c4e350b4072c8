//! Plain text rendering for the terminal.
//!
//! Every renderer returns a String so the output can be tested without
//! capturing stdout.

use chrono::{DateTime, Utc};

use crate::diff::{DiffReport, LineKind};
use crate::hash;
use crate::ledger::{Device, VersionSummary};
use crate::scan::{CycleReport, FileOutcome};

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn devices(devices: &[Device]) -> String {
    if devices.is_empty() {
        return String::from("No devices recorded. Run 'blackbox scan' to create some.\n");
    }

    let mut output = format!("{:<6} {:<30} {:<20}\n", "ID", "Name", "First seen");
    output.push_str(&"-".repeat(58));
    output.push('\n');

    for device in devices {
        output.push_str(&format!(
            "{:<6} {:<30} {:<20}\n",
            device.id,
            truncate(&device.name, 30),
            format_time(&device.created_at)
        ));
    }

    output
}

pub fn versions(versions: &[VersionSummary]) -> String {
    if versions.is_empty() {
        return String::from("No versions recorded.\n");
    }

    let mut output = format!(
        "{:<6} {:<24} {:<20} {:<10}\n",
        "ID", "Device", "Captured", "Hash"
    );
    output.push_str(&"-".repeat(63));
    output.push('\n');

    for version in versions {
        output.push_str(&format!(
            "{:<6} {:<24} {:<20} {:<10}\n",
            version.id,
            truncate(&version.device_name, 24),
            format_time(&version.version_date),
            hash::short(&version.file_hash)
        ));
    }

    output
}

/// Unified-style listing: one marker column, then the line number of the
/// side the line belongs to.
pub fn diff(report: &DiffReport) -> String {
    let mut output = format!(
        "Comparing versions:\n  From: #{}\n  To:   #{}\n\n",
        report.left_version_id, report.right_version_id
    );

    let stats = report.stats();
    if stats.is_identical() {
        output.push_str("No changes detected.\n");
        return output;
    }

    let width = report
        .lines
        .iter()
        .map(|l| l.line_number)
        .max()
        .unwrap_or(0)
        .to_string()
        .len();

    for line in &report.lines {
        let marker = match line.kind {
            LineKind::Unchanged => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
        };
        output.push_str(&format!(
            "{marker} {:>width$} | {}\n",
            line.line_number, line.content
        ));
    }

    output.push_str(&format!(
        "\n{} added, {} removed, {} unchanged\n",
        stats.added, stats.removed, stats.unchanged
    ));

    output
}

pub fn cycle(report: &CycleReport, verbose: bool) -> String {
    let mut output = String::new();

    for file in &report.files {
        let name = file
            .device
            .clone()
            .unwrap_or_else(|| file.path.display().to_string());

        match &file.outcome {
            FileOutcome::Created { version_id, hash, .. } => {
                output.push_str(&format!("  [new] {name} -> version {version_id} ({})\n", hash::short(hash)));
            }
            FileOutcome::Unchanged { .. } if verbose => {
                output.push_str(&format!("  [same] {name}\n"));
            }
            FileOutcome::Unchanged { .. } => {}
            FileOutcome::Failed { stage, error } => {
                output.push_str(&format!("  [failed] {name} at {stage:?}: {error}\n"));
            }
        }
    }

    output.push_str(&format!(
        "\n{} file(s): {} new, {} unchanged, {} failed\n",
        report.discovered,
        report.created(),
        report.unchanged(),
        report.failed()
    ));

    if let Some(ms) = report.duration_ms {
        output.push_str(&format!("scan completed in {:.2}s\n", ms as f64 / 1000.0));
    }

    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
