//! End-to-end migration scenarios against throwaway local git repositories.
//!
//! A bare repository stands in for the destination remote and an injected
//! import closure stands in for git-tfs, so the full state machine runs
//! offline: import, enumerate, select, confirm, remote configuration,
//! push-and-verify, and report persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use tfs2git_core::exec::{self, CommandLine};
use tfs2git_core::migration::{
    CancellationPoint, MigrationError, MigrationParams, Outcome, RunOutcome, run_migration_with,
};
use tfs2git_core::report;
use tfs2git_core::selection::SelectionDirective;

fn git(repo: &Path, args: &[&str]) {
    let cmd = CommandLine::new("git")
        .args(args.iter().copied())
        .current_dir(repo);
    exec::run_captured(&cmd).expect("git command should succeed");
}

fn commit(repo: &Path, message: &str) {
    git(repo, &["add", "."]);
    git(
        repo,
        &[
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.com",
            "commit",
            "-q",
            "-m",
            message,
        ],
    );
}

/// Builds a source history in `repo` with branches `master`, `feature1`,
/// and `feature2`, each carrying distinct content. Used as the injected
/// import step.
fn fake_import(repo: &Path) {
    git(repo, &["init", "-q", "-b", "master"]);
    std::fs::write(repo.join("readme.txt"), "base").unwrap();
    commit(repo, "base");

    git(repo, &["checkout", "-q", "-b", "feature1"]);
    std::fs::write(repo.join("f1.txt"), "one").unwrap();
    commit(repo, "feature1 work");

    git(repo, &["checkout", "-q", "master"]);
    git(repo, &["checkout", "-q", "-b", "feature2"]);
    std::fs::write(repo.join("f2.txt"), "two").unwrap();
    commit(repo, "feature2 work");

    git(repo, &["checkout", "-q", "master"]);
}

struct Fixture {
    _base: tempfile::TempDir,
    clone_dir: PathBuf,
    dest: PathBuf,
}

fn fixture() -> Fixture {
    let base = tempfile::tempdir().expect("create tempdir");
    let clone_dir = base.path().join("clone");
    let dest = base.path().join("dest.git");
    std::fs::create_dir(&dest).unwrap();
    git(&dest, &["init", "-q", "--bare"]);
    Fixture {
        _base: base,
        clone_dir,
        dest,
    }
}

fn params(fixture: &Fixture, directive: SelectionDirective) -> MigrationParams {
    MigrationParams {
        clone_dir: fixture.clone_dir.clone(),
        source_url: "http://server:8080/tfs/TeamProject".to_string(),
        source_root: "$/demo/main".to_string(),
        dest_url: fixture.dest.display().to_string(),
        directive,
        auto_confirm: true,
    }
}

fn run(
    params: &MigrationParams,
    sink: &mut Vec<u8>,
    confirm_answer: bool,
) -> Result<RunOutcome, MigrationError> {
    run_migration_with(
        params,
        sink,
        |_| confirm_answer,
        |p, _sink: &mut Vec<u8>| {
            fake_import(&p.clone_dir);
            Ok(())
        },
    )
}

// Scenario: first-N selection pushes the first branches in enumeration order
// and verifies each one.
#[test]
fn first_two_branches_pass_verification_in_order() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::First(2));
    let mut sink = Vec::new();

    let outcome = run(&p, &mut sink, true).expect("run should complete");
    let RunOutcome::Completed { run, report_path } = outcome else {
        panic!("expected completed run");
    };

    // `git branch` lists alphabetically: feature1, feature2, master.
    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[0].branch, "feature1");
    assert_eq!(run.records[1].branch, "feature2");
    for record in &run.records {
        assert_eq!(record.outcome, Outcome::Pass);
        let after = record.after.as_ref().expect("after snapshot");
        assert_eq!(after.branch, format!("origin/{}", record.branch));
        assert_eq!(record.before.commit_checksum, after.commit_checksum);
        assert_eq!(record.before.tree_checksum, after.tree_checksum);
    }

    let written = std::fs::read_to_string(&report_path).unwrap();
    assert!(written.contains("2 pushed, 2 passed, 0 failed"));
}

// Scenario: one rejected branch is recorded FAIL while the others still pass;
// the run completes and the report holds all three records.
#[cfg(unix)]
#[test]
fn rejected_branch_fails_without_aborting_the_rest() {
    use std::os::unix::fs::PermissionsExt;

    let fx = fixture();

    // Destination hook rejecting only refs/heads/feature2.
    let hook_path = fx.dest.join("hooks").join("pre-receive");
    std::fs::write(
        &hook_path,
        "#!/bin/sh\nwhile read old new ref; do\n  if [ \"$ref\" = \"refs/heads/feature2\" ]; then exit 1; fi\ndone\nexit 0\n",
    )
    .unwrap();
    std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755)).unwrap();

    let p = params(&fx, SelectionDirective::All);
    let mut sink = Vec::new();

    let outcome = run(&p, &mut sink, true).expect("run should complete despite the rejection");
    let RunOutcome::Completed { run, report_path } = outcome else {
        panic!("expected completed run");
    };

    assert_eq!(run.records.len(), 3);
    assert_eq!(run.passed(), 2);
    assert_eq!(run.failed(), 1);

    let failed: Vec<_> = run
        .records
        .iter()
        .filter(|r| r.outcome == Outcome::Fail)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].branch, "feature2");
    assert!(failed[0].after.is_none());

    let written = std::fs::read_to_string(&report_path).unwrap();
    assert!(written.contains("3 pushed, 2 passed, 1 failed"));
    assert!(written.contains("push failed; no destination snapshot was taken"));
}

// Scenario: abort directive cancels cleanly before any remote configuration
// or push; no report is created.
#[test]
fn abort_directive_cancels_before_any_side_effects() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::Abort);
    let mut sink = Vec::new();

    let outcome = run(&p, &mut sink, true).expect("abort is not an error");
    assert!(matches!(
        outcome,
        RunOutcome::Cancelled(CancellationPoint::BranchSelection)
    ));

    assert!(!report::report_path(&fx.clone_dir).exists());
    // No remote was registered in the clone.
    let remotes = exec::run_captured(&exec::git_in(&fx.clone_dir, ["remote"])).unwrap();
    assert!(remotes.stdout.trim().is_empty());
}

// Scenario: declining confirmation cancels cleanly with no side effects.
#[test]
fn declined_confirmation_cancels_before_remote_configuration() {
    let fx = fixture();
    let mut p = params(&fx, SelectionDirective::All);
    p.auto_confirm = false;
    let mut sink = Vec::new();

    let outcome = run(&p, &mut sink, false).expect("declining is not an error");
    assert!(matches!(
        outcome,
        RunOutcome::Cancelled(CancellationPoint::Confirmation)
    ));

    assert!(!report::report_path(&fx.clone_dir).exists());
    let remotes = exec::run_captured(&exec::git_in(&fx.clone_dir, ["remote"])).unwrap();
    assert!(remotes.stdout.trim().is_empty());
}

// Out-of-range first-N fails after enumeration with no remote configured.
#[test]
fn out_of_range_selection_is_an_error() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::First(10));
    let mut sink = Vec::new();

    let result = run(&p, &mut sink, true);
    assert!(matches!(result, Err(MigrationError::Selection(_))));
    assert!(!report::report_path(&fx.clone_dir).exists());
}

// An import that yields a repository with no branches is a fatal
// precondition, not an empty successful run.
#[test]
fn empty_import_fails_with_no_branches_found() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::All);
    let mut sink = Vec::new();

    let result = run_migration_with(
        &p,
        &mut sink,
        |_| true,
        |params, _sink: &mut Vec<u8>| {
            // git init with no commits lists no branches.
            git(&params.clone_dir, &["init", "-q", "-b", "master"]);
            Ok(())
        },
    );

    assert!(matches!(result, Err(MigrationError::NoBranchesFound)));
    assert!(!report::report_path(&fx.clone_dir).exists());
}

// Removing a remote that was never registered is a swallowed no-op and does
// not affect the subsequent add.
#[test]
fn remote_removal_without_remote_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q", "-b", "master"]);

    let removal = exec::run_captured_unchecked(&exec::git_in(
        dir.path(),
        ["remote", "remove", "origin"],
    ))
    .expect("spawn should succeed");
    assert!(!removal.success());

    git(
        dir.path(),
        &["remote", "add", "origin", "https://example.com/org/repo"],
    );
    let url = exec::run_captured(&exec::git_in(dir.path(), ["remote", "get-url", "origin"]))
        .unwrap();
    assert_eq!(url.stdout.trim(), "https://example.com/org/repo");
}

// A second run against a clone directory left behind by a first run must be
// rejected before anything mutates.
#[test]
fn leftover_clone_directory_is_a_precondition_failure() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::All);
    let mut sink = Vec::new();
    run(&p, &mut sink, true).expect("first run should complete");

    let mut second_sink = Vec::new();
    let result = run(&p, &mut second_sink, true);
    assert!(matches!(
        result,
        Err(MigrationError::DirectoryNotEmpty { .. })
    ));
}

// The import step's streamed output reaches the caller's sink.
#[test]
fn import_progress_reaches_the_sink() {
    let fx = fixture();
    let p = params(&fx, SelectionDirective::Abort);
    let mut sink = Vec::new();

    run_migration_with(
        &p,
        &mut sink,
        |_| true,
        |params, sink: &mut Vec<u8>| {
            fake_import(&params.clone_dir);
            writeln!(sink, "C42 = abc123 (imported changeset)").map_err(|source| {
                tfs2git_core::exec::CommandError::Io {
                    command: "fake import".to_string(),
                    source,
                }
            })
        },
    )
    .unwrap();

    let output = String::from_utf8(sink).unwrap();
    assert!(output.contains("imported changeset"));
    assert!(output.contains("Found 3 local branches"));
}
