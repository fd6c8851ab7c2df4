//! Audit report rendering and persistence.
//!
//! The report is a deterministic, human-readable text document: a header with
//! the run timestamp and parameters, then one block per validation record in
//! processing order. It is a per-run artifact; writing overwrites any
//! existing file at the destination.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use crate::inspect::BranchSnapshot;
use crate::migration::MigrationRun;

/// Deterministic report file name inside the clone directory.
pub const REPORT_FILE_NAME: &str = "migration-report.txt";

/// Where the report for a run rooted at `clone_dir` lives.
#[must_use]
pub fn report_path(clone_dir: &Path) -> PathBuf {
    clone_dir.join(REPORT_FILE_NAME)
}

/// Renders the full report document for `run`.
#[must_use]
pub fn render(run: &MigrationRun) -> String {
    let mut out = String::new();
    out.push_str("==============================================\n");
    out.push_str(" TFS -> Git migration report\n");
    out.push_str("==============================================\n");
    out.push_str(&format!(
        "generated_at:  {}\n",
        run.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!("clone_dir:     {}\n", run.clone_dir.display()));
    out.push_str(&format!("source_url:    {}\n", run.source_url));
    out.push_str(&format!("source_root:   {}\n", run.source_root));
    out.push_str(&format!("dest_url:      {}\n", run.dest_url));
    out.push_str(&format!(
        "result:        {} pushed, {} passed, {} failed\n",
        run.records.len(),
        run.passed(),
        run.failed()
    ));

    for record in &run.records {
        out.push('\n');
        out.push_str(&format!("branch: {}\n", record.branch));
        out.push_str(&format!("  outcome:       {}\n", record.outcome.as_str()));
        out.push_str(&snapshot_lines("before", Some(&record.before)));
        out.push_str(&snapshot_lines("after", record.after.as_ref()));
        if record.after.is_none() {
            out.push_str("  note:          push failed; no destination snapshot was taken\n");
        }
    }
    out
}

fn snapshot_lines(label: &str, snapshot: Option<&BranchSnapshot>) -> String {
    match snapshot {
        Some(snap) => format!(
            "  {label} files:  {}\n  {label} commit: {}\n  {label} tree:   {}\n",
            snap.file_count, snap.commit_checksum, snap.tree_checksum
        ),
        None => format!("  {label} files:  -\n  {label} commit: -\n  {label} tree:   -\n"),
    }
}

/// Writes the rendered report to `path`, replacing any previous run's file.
///
/// # Errors
///
/// Returns the underlying I/O error when `path` is not writable. A failed
/// write is fatal to the run's final step but does not invalidate branches
/// that were already pushed.
pub fn write_report(run: &MigrationRun, path: &Path) -> io::Result<()> {
    fs::write(path, render(run))
}
