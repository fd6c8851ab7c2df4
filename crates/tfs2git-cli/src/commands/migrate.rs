//! The `migrate` command: parameter collection, engine invocation, and
//! exit-code mapping.
//!
//! Parameters omitted on the command line are collected through sequential
//! interactive prompts; `--yes` switches the pre-push confirmation to
//! auto-proceed.
//!
//! # Exit Codes
//!
//! - 0: completed run (per-branch FAIL records are report data, not process
//!   errors) or clean operator cancellation
//! - 1: precondition failure (missing tool, non-empty clone directory, empty
//!   branch list, failed import, missing required input)
//! - 2: unparseable or out-of-range branch selection input

use std::io;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tfs2git_core::migration::{
    CancellationPoint, MigrationError, MigrationParams, MigrationRun, RunOutcome, run_migration,
};
use tfs2git_core::selection::SelectionDirective;

use crate::exit_codes::codes as exit_codes;
use crate::prompt;

/// Arguments for `tfs2git migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Directory the TFS repository is cloned into (must be absent or empty)
    #[arg(long)]
    pub clone_dir: Option<PathBuf>,

    /// TFS collection URL (example: http://server:8080/tfs/TeamProject)
    #[arg(long)]
    pub source_url: Option<String>,

    /// TFS root branch path (example: $/demo123/test)
    #[arg(long)]
    pub source_root: Option<String>,

    /// Destination Git repository URL
    #[arg(long)]
    pub dest_url: Option<String>,

    /// Branch selection: `all`, `first:N`, or `abort`
    #[arg(long)]
    pub branches: Option<String>,

    /// Skip the pre-push confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Summary output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

/// Runs the migration and returns the process exit code.
pub fn run_migrate(args: &MigrateArgs) -> u8 {
    let clone_dir = match required_input(
        args.clone_dir
            .as_ref()
            .map(|p| p.display().to_string()),
        "Enter directory path where the TFS repo should be cloned",
        "clone directory",
    ) {
        Ok(value) => PathBuf::from(value),
        Err(code) => return code,
    };
    let source_url = match required_input(
        args.source_url.clone(),
        "Enter TFS collection URL (example: http://server:8080/tfs/TeamProject)",
        "TFS collection URL",
    ) {
        Ok(value) => value,
        Err(code) => return code,
    };
    let source_root = match required_input(
        args.source_root.clone(),
        "Enter TFS root branch path (example: $/demo123/test)",
        "TFS root branch path",
    ) {
        Ok(value) => value,
        Err(code) => return code,
    };
    let dest_url = match required_input(
        args.dest_url.clone(),
        "Enter destination Git repo URL",
        "destination repo URL",
    ) {
        Ok(value) => value,
        Err(code) => return code,
    };
    let directive = match collect_directive(args.branches.as_deref()) {
        Ok(value) => value,
        Err(code) => return code,
    };

    let params = MigrationParams {
        clone_dir,
        source_url,
        source_root,
        dest_url,
        directive,
        auto_confirm: args.yes,
    };

    let mut sink = io::stdout();
    match run_migration(&params, &mut sink, prompt::confirm) {
        Ok(RunOutcome::Completed { run, report_path }) => {
            print_summary(&run, &report_path, &args.format);
            exit_codes::SUCCESS
        },
        Ok(RunOutcome::Cancelled(point)) => {
            let location = match point {
                CancellationPoint::BranchSelection => "at branch selection",
                CancellationPoint::Confirmation => "at confirmation",
            };
            println!("Migration cancelled {location}; nothing was pushed.");
            exit_codes::SUCCESS
        },
        Err(MigrationError::Selection(err)) => {
            eprintln!("ERROR: {err}");
            exit_codes::INVALID_ARGS
        },
        Err(err) => {
            eprintln!("ERROR: {err}");
            exit_codes::PRECONDITION_FAILURE
        },
    }
}

fn required_input(value: Option<String>, message: &str, what: &str) -> Result<String, u8> {
    let raw = match value {
        Some(raw) => raw,
        None => match prompt::line(message) {
            Ok(raw) => raw,
            Err(err) => {
                eprintln!("ERROR: failed to read {what}: {err}");
                return Err(exit_codes::PRECONDITION_FAILURE);
            },
        },
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        eprintln!("ERROR: {what} is required");
        return Err(exit_codes::PRECONDITION_FAILURE);
    }
    Ok(trimmed.to_string())
}

/// Parses the `--branches` value: `all`, `abort`, or `first:N`.
fn parse_directive(raw: &str) -> Result<SelectionDirective, String> {
    let normalized = raw.trim().to_lowercase();
    match normalized.as_str() {
        "all" => Ok(SelectionDirective::All),
        "abort" => Ok(SelectionDirective::Abort),
        other => match other.strip_prefix("first:") {
            Some(count) => count
                .parse::<usize>()
                .map(SelectionDirective::First)
                .map_err(|_| format!("invalid branch count `{count}` in `{raw}`")),
            None => Err(format!(
                "invalid branch selection `{raw}` (expected `all`, `first:N`, or `abort`)"
            )),
        },
    }
}

fn collect_directive(flag: Option<&str>) -> Result<SelectionDirective, u8> {
    if let Some(raw) = flag {
        return parse_directive(raw).map_err(|err| {
            eprintln!("ERROR: {err}");
            exit_codes::INVALID_ARGS
        });
    }

    let answer = match prompt::line("Push (a)ll branches, the first (n) branches, or a(b)ort? [a/n/b]") {
        Ok(answer) => answer,
        Err(err) => {
            eprintln!("ERROR: failed to read branch selection: {err}");
            return Err(exit_codes::PRECONDITION_FAILURE);
        },
    };
    match answer.to_lowercase().as_str() {
        "" | "a" | "all" => Ok(SelectionDirective::All),
        "b" | "abort" => Ok(SelectionDirective::Abort),
        "n" | "first" => {
            let raw = match prompt::line("Enter number of branches to push") {
                Ok(raw) => raw,
                Err(err) => {
                    eprintln!("ERROR: failed to read branch count: {err}");
                    return Err(exit_codes::PRECONDITION_FAILURE);
                },
            };
            raw.trim()
                .parse::<usize>()
                .map(SelectionDirective::First)
                .map_err(|_| {
                    eprintln!("ERROR: invalid branch count `{raw}`");
                    exit_codes::INVALID_ARGS
                })
        },
        other => {
            eprintln!("ERROR: unrecognized choice `{other}` (expected a, n, or b)");
            Err(exit_codes::INVALID_ARGS)
        },
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    passed: usize,
    failed: usize,
    report_path: String,
    #[serde(flatten)]
    run: &'a MigrationRun,
}

fn print_summary(run: &MigrationRun, report_path: &std::path::Path, format: &str) {
    if format == "json" {
        let summary = RunSummary {
            passed: run.passed(),
            failed: run.failed(),
            report_path: report_path.display().to_string(),
            run,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("WARNING: failed to render JSON summary: {err}"),
        }
        return;
    }

    println!();
    println!("==============================");
    println!(" Migration Summary");
    println!("==============================");
    for record in &run.records {
        println!("  {} {}", record.outcome.as_str(), record.branch);
    }
    println!();
    println!(
        "{} passed, {} failed. Report written to {}",
        run.passed(),
        run.failed(),
        report_path.display()
    );
}
