//! Migration orchestration.
//!
//! The state machine driving import → enumerate → select → confirm →
//! push-and-verify → report. Each state is a precondition for the next:
//!
//! 1. **Initialized** — clone directory absent (created) or empty.
//! 2. **Imported** — `git tfs clone` of all branches, output streamed live.
//! 3. **Enumerated** — local branches listed; empty is fatal.
//! 4. **Selected** — selection policy applied; `Abort` cancels cleanly.
//! 5. **Confirmed** — operator confirmation unless pre-confirmed.
//! 6. **Remote-configured** — stale `origin` removed (idempotent), target
//!    registered.
//! 7. **Pushed-and-validated** — per branch in selection order: snapshot,
//!    push, snapshot the tracking ref, record PASS/FAIL. One branch's failed
//!    push never aborts the remaining branches.
//! 8. **Reported** — the audit report is persisted inside the clone.
//!
//! Confirmation and the import step are injected so the machine runs headless
//! in tests; production wiring lives in [`run_migration`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::exec::{self, CommandError, CommandLine};
use crate::inspect::{BranchSnapshot, RepoInspector};
use crate::report;
use crate::selection::{self, SelectionDirective, SelectionError};

/// Name under which the destination is registered in the clone.
pub const DESTINATION_REMOTE: &str = "origin";

// ─────────────────────────────────────────────────────────────────────────────
// Parameters and run state
// ─────────────────────────────────────────────────────────────────────────────

/// Fully formed parameter bundle for one migration run. Collecting these
/// (prompts, flags) is the caller's concern; the orchestrator only validates.
#[derive(Debug, Clone)]
pub struct MigrationParams {
    /// Directory the TFS repository is imported into.
    pub clone_dir: PathBuf,
    /// TFS collection URL (e.g. `http://server:8080/tfs/TeamProject`).
    pub source_url: String,
    /// TFS root branch path (e.g. `$/demo123/test`).
    pub source_root: String,
    /// Destination Git repository URL.
    pub dest_url: String,
    /// Which branches to push.
    pub directive: SelectionDirective,
    /// Skip the interactive confirmation step.
    pub auto_confirm: bool,
}

/// Per-branch verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Before and after snapshots are field-equal.
    Pass,
    /// Snapshots differ, or the push failed before an after snapshot existed.
    Fail,
}

impl Outcome {
    /// Report label for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

/// One branch's validation result. Immutable after creation; appended to the
/// run and never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Branch that was pushed.
    pub branch: String,
    /// Snapshot of the local branch before the push.
    pub before: BranchSnapshot,
    /// Snapshot of the destination-tracking ref after the push. `None` when
    /// the push itself failed (no comparison was possible).
    pub after: Option<BranchSnapshot>,
    /// Verification outcome, a pure function of `before` and `after`.
    pub outcome: Outcome,
}

impl ValidationRecord {
    /// Builds a record, deriving the outcome: PASS if and only if the after
    /// snapshot exists and its file count, commit checksum, and tree checksum
    /// all equal the before snapshot's. Never overridden.
    #[must_use]
    pub fn new(branch: impl Into<String>, before: BranchSnapshot, after: Option<BranchSnapshot>) -> Self {
        let outcome = match &after {
            Some(after_snap) if snapshots_match(&before, after_snap) => Outcome::Pass,
            _ => Outcome::Fail,
        };
        Self {
            branch: branch.into(),
            before,
            after,
            outcome,
        }
    }
}

/// Field-by-field content equality. The `branch` field is excluded: the
/// after snapshot is taken from the tracking ref, whose name necessarily
/// differs from the local branch name.
fn snapshots_match(before: &BranchSnapshot, after: &BranchSnapshot) -> bool {
    before.file_count == after.file_count
        && before.commit_checksum == after.commit_checksum
        && before.tree_checksum == after.tree_checksum
}

/// All state owned by one migration invocation. Single-owner, single-writer:
/// only the orchestrating thread appends records.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRun {
    /// Directory the repository was imported into.
    pub clone_dir: PathBuf,
    /// TFS collection URL.
    pub source_url: String,
    /// TFS root branch path.
    pub source_root: String,
    /// Destination Git repository URL.
    pub dest_url: String,
    /// When the run started (UTC).
    pub started_at: DateTime<Utc>,
    /// Per-branch validation records, in processing order.
    pub records: Vec<ValidationRecord>,
}

impl MigrationRun {
    fn new(params: &MigrationParams) -> Self {
        Self {
            clone_dir: params.clone_dir.clone(),
            source_url: params.source_url.clone(),
            source_root: params.source_root.clone(),
            dest_url: params.dest_url.clone(),
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Number of records that passed verification.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == Outcome::Pass)
            .count()
    }

    /// Number of records that failed verification.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }
}

/// Where a clean cancellation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPoint {
    /// The operator's directive was `Abort`.
    BranchSelection,
    /// The operator declined the pre-push confirmation.
    Confirmation,
}

/// How a run ended when no error occurred. Cancellation is a deliberate
/// operator exit, not a failure; both variants map to a zero exit status.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run went through all states; individual branches may still have
    /// FAIL records — those are data in the report, not process errors.
    Completed {
        /// The finalized run.
        run: MigrationRun,
        /// Where the audit report was written.
        report_path: PathBuf,
    },
    /// The operator stopped the run before any push occurred.
    Cancelled(CancellationPoint),
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that abort a migration run. All of these occur before or outside
/// the per-branch push loop; a failed push only fails that branch's record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MigrationError {
    /// A required external tool is absent or not version-queryable.
    #[error("required tool `{tool}` is not available (install it and re-run): {source}")]
    ToolMissing {
        /// Tool name (`git`, `git-tfs`).
        tool: String,
        /// The failed version probe.
        #[source]
        source: CommandError,
    },

    /// The target clone directory exists and is not empty.
    #[error("target directory {path} exists and is not empty")]
    DirectoryNotEmpty {
        /// The offending path.
        path: String,
    },

    /// The clone directory could not be created or read.
    #[error("failed to prepare clone directory {path}: {source}")]
    CloneDir {
        /// The directory being prepared.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The import from TFS failed.
    #[error("TFS import failed: {0}")]
    Import(#[source] CommandError),

    /// Listing local branches after the import failed.
    #[error("failed to enumerate branches: {0}")]
    Enumerate(#[source] CommandError),

    /// The import produced no branches to migrate.
    #[error("no branches found after import")]
    NoBranchesFound,

    /// The selection directive was invalid for the enumerated branches.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Registering the destination remote failed.
    #[error("failed to configure destination remote: {0}")]
    Remote(#[source] CommandError),

    /// A local branch could not be snapshotted before its push, which means
    /// the imported clone itself is unreadable.
    #[error("failed to inspect branch `{branch}`: {source}")]
    Inspect {
        /// The branch being snapshotted.
        branch: String,
        /// Underlying command error.
        #[source]
        source: CommandError,
    },

    /// The audit report could not be persisted. Already-pushed branches
    /// remain pushed; only the final step failed.
    #[error("failed to write migration report to {path}: {source}")]
    Report {
        /// Report destination.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing operator progress output failed.
    #[error("failed to write progress output: {0}")]
    Output(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// State transitions
// ─────────────────────────────────────────────────────────────────────────────

/// Verifies that both required external tools respond to a version probe.
/// Must pass before any other step runs.
///
/// # Errors
///
/// Returns [`MigrationError::ToolMissing`] naming the absent tool.
pub fn preflight() -> Result<(), MigrationError> {
    require_tool("git", &CommandLine::new("git").arg("--version"))?;
    require_tool("git-tfs", &CommandLine::new("git").args(["tfs", "--version"]))?;
    Ok(())
}

fn require_tool(tool: &str, probe: &CommandLine) -> Result<(), MigrationError> {
    exec::run_captured(probe)
        .map(|_| ())
        .map_err(|source| MigrationError::ToolMissing {
            tool: tool.to_string(),
            source,
        })
}

fn prepare_clone_dir(dir: &Path) -> Result<(), MigrationError> {
    let as_string = || dir.display().to_string();
    if dir.exists() {
        let mut entries = fs::read_dir(dir).map_err(|source| MigrationError::CloneDir {
            path: as_string(),
            source,
        })?;
        if entries.next().is_some() {
            return Err(MigrationError::DirectoryNotEmpty { path: as_string() });
        }
    } else {
        fs::create_dir_all(dir).map_err(|source| MigrationError::CloneDir {
            path: as_string(),
            source,
        })?;
    }
    Ok(())
}

/// Lists local branch names in the order git reports them.
///
/// # Errors
///
/// Returns [`MigrationError::Enumerate`] when `git branch` fails and
/// [`MigrationError::NoBranchesFound`] when the listing is empty.
pub fn enumerate_branches(repo: &Path) -> Result<Vec<String>, MigrationError> {
    let result =
        exec::run_captured(&exec::git_in(repo, ["branch"])).map_err(MigrationError::Enumerate)?;
    let branches = parse_branch_listing(&result.stdout);
    if branches.is_empty() {
        return Err(MigrationError::NoBranchesFound);
    }
    Ok(branches)
}

/// Strips the current-branch marker and whitespace from `git branch` output.
fn parse_branch_listing(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.replace('*', "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn import_from_tfs<W>(params: &MigrationParams, sink: &mut W) -> Result<(), CommandError>
where
    W: Write + Send,
{
    let cmd = exec::git_in(
        &params.clone_dir,
        [
            "tfs",
            "clone",
            params.source_url.as_str(),
            params.source_root.as_str(),
            ".",
            "--branches=all",
        ],
    );
    exec::run_streamed(&cmd, sink)
}

fn configure_remote(repo: &Path, dest_url: &str) -> Result<(), MigrationError> {
    // Removing a remote that was never registered exits non-zero; that is the
    // expected idempotent no-op and must not affect the subsequent add.
    exec::run_captured_unchecked(&exec::git_in(
        repo,
        ["remote", "remove", DESTINATION_REMOTE],
    ))
    .map_err(MigrationError::Remote)?;

    exec::run_captured(&exec::git_in(
        repo,
        ["remote", "add", DESTINATION_REMOTE, dest_url],
    ))
    .map_err(MigrationError::Remote)?;
    Ok(())
}

fn push_and_validate<W>(
    inspector: &RepoInspector,
    branch: &str,
    sink: &mut W,
) -> Result<ValidationRecord, MigrationError>
where
    W: Write + Send,
{
    let before = inspector
        .snapshot(branch)
        .map_err(|source| MigrationError::Inspect {
            branch: branch.to_string(),
            source,
        })?;

    let push = exec::git_in(
        inspector.repo(),
        ["push", "-u", DESTINATION_REMOTE, branch],
    );
    if let Err(err) = exec::run_captured(&push) {
        writeln!(sink, "  push failed: {err}")?;
        return Ok(ValidationRecord::new(branch, before, None));
    }

    let tracking = format!("{DESTINATION_REMOTE}/{branch}");
    match inspector.snapshot(&tracking) {
        Ok(after) => Ok(ValidationRecord::new(branch, before, Some(after))),
        Err(err) => {
            // The push went through but the destination-tracking ref cannot
            // be read; without an after snapshot the comparison is a FAIL.
            writeln!(sink, "  destination snapshot failed: {err}")?;
            Ok(ValidationRecord::new(branch, before, None))
        },
    }
}

fn render_confirmation(params: &MigrationParams, selected: &[String]) -> String {
    let mut out = String::new();
    out.push_str("Migration plan\n");
    out.push_str("--------------\n");
    out.push_str(&format!("  clone directory: {}\n", params.clone_dir.display()));
    out.push_str(&format!("  TFS collection:  {}\n", params.source_url));
    out.push_str(&format!("  TFS root branch: {}\n", params.source_root));
    out.push_str(&format!("  destination:     {}\n", params.dest_url));
    out.push_str(&format!("  branches to push ({}):\n", selected.len()));
    for branch in selected {
        out.push_str(&format!("    - {branch}\n"));
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Runs a full migration: preflight, then the state machine with the real
/// `git tfs clone` importer.
///
/// `sink` receives live progress output; `confirm` is consulted at the
/// pre-push decision point unless `params.auto_confirm` is set.
///
/// # Errors
///
/// Returns [`MigrationError`] for precondition and setup/import/enumeration
/// failures. Per-branch push failures are recorded, not raised.
pub fn run_migration<W, C>(
    params: &MigrationParams,
    sink: &mut W,
    confirm: C,
) -> Result<RunOutcome, MigrationError>
where
    W: Write + Send,
    C: FnMut(&str) -> bool,
{
    preflight()?;
    run_migration_with(params, sink, confirm, import_from_tfs)
}

/// Runs the migration state machine with an injected import step. Skips the
/// tool preflight; [`run_migration`] is the production wrapper.
///
/// # Errors
///
/// Same as [`run_migration`], minus [`MigrationError::ToolMissing`].
pub fn run_migration_with<W, C, I>(
    params: &MigrationParams,
    sink: &mut W,
    mut confirm: C,
    mut import: I,
) -> Result<RunOutcome, MigrationError>
where
    W: Write + Send,
    C: FnMut(&str) -> bool,
    I: FnMut(&MigrationParams, &mut W) -> Result<(), CommandError>,
{
    // State 1: Initialized.
    prepare_clone_dir(&params.clone_dir)?;
    let mut run = MigrationRun::new(params);
    info!(clone_dir = %params.clone_dir.display(), "migration run started");

    // State 2: Imported.
    writeln!(
        sink,
        "Importing TFS repository (all branches); progress follows."
    )?;
    import(params, sink).map_err(MigrationError::Import)?;
    // git-tfs maps the TFS root branch onto the local `master` branch; a
    // known side effect worth surfacing, not an error.
    writeln!(
        sink,
        "Note: git-tfs migrates the TFS root branch {} to the Git branch `master`.",
        params.source_root
    )?;

    // State 3: Enumerated.
    let branches = enumerate_branches(&params.clone_dir)?;
    writeln!(sink, "Found {} local branches:", branches.len())?;
    for (idx, branch) in branches.iter().enumerate() {
        writeln!(sink, "  {}. {branch}", idx + 1)?;
    }

    // State 4: Selected.
    if params.directive == SelectionDirective::Abort {
        info!("operator aborted at branch selection");
        return Ok(RunOutcome::Cancelled(CancellationPoint::BranchSelection));
    }
    let selected = selection::select(&branches, params.directive)?;

    // State 5: Confirmed. No side effects against the destination yet.
    writeln!(sink, "{}", render_confirmation(params, &selected))?;
    if !params.auto_confirm && !confirm("Proceed with push and verification?") {
        info!("operator declined confirmation");
        return Ok(RunOutcome::Cancelled(CancellationPoint::Confirmation));
    }

    // State 6: Remote-configured.
    configure_remote(&params.clone_dir, &params.dest_url)?;

    // State 7: Pushed-and-validated, strictly in selection order.
    let inspector = RepoInspector::new(&params.clone_dir);
    for branch in &selected {
        writeln!(sink, "Pushing branch {branch}...")?;
        let record = push_and_validate(&inspector, branch, sink)?;
        writeln!(sink, "  {branch}: {}", record.outcome.as_str())?;
        run.records.push(record);
    }

    // State 8: Reported.
    let report_path = report::report_path(&params.clone_dir);
    report::write_report(&run, &report_path).map_err(|source| MigrationError::Report {
        path: report_path.display().to_string(),
        source,
    })?;
    writeln!(
        sink,
        "Migration finished: {} passed, {} failed. Report: {}",
        run.passed(),
        run.failed(),
        report_path.display()
    )?;
    info!(
        passed = run.passed(),
        failed = run.failed(),
        "migration run completed"
    );

    Ok(RunOutcome::Completed { run, report_path })
}
