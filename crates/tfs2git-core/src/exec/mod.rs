//! External command execution.
//!
//! Two execution modes with distinct contracts:
//!
//! - [`run_captured`] blocks until the process exits and returns stdout and
//!   stderr separately. Non-zero exit is an error unless the caller uses
//!   [`run_captured_unchecked`] (needed for idempotent operations such as
//!   "remove remote if present").
//! - [`run_streamed`] forwards merged stdout+stderr to the caller's sink
//!   line-by-line as the process produces it, for long-running commands where
//!   the operator needs live progress. It still blocks to completion and
//!   fails on non-zero exit.
//!
//! Every command is attempted exactly once and has no timeout: a hung child
//! hangs the run, which is acceptable for an operator-attended one-shot tool.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// Exit code reported when the child was terminated without one (by signal).
const NO_EXIT_CODE: i32 = -1;

/// A command invocation: program, arguments, and optional working directory.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    /// Creates a command line for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory the command runs in.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human-readable rendering for diagnostics (`git push -u origin master`).
    #[must_use]
    pub fn rendered(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

/// Result of a captured command invocation. Immutable once produced.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Process exit code (`-1` when the process was killed by a signal).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandResult {
    /// True when the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors from external command execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failed while reading the child's output.
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited with a non-zero status.
    #[error("command `{command}` failed with exit code {exit_code}: {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code of the child.
        exit_code: i32,
        /// Captured stderr, trimmed. Empty when output was streamed.
        stderr: String,
    },
}

/// Runs a command to completion, capturing stdout and stderr separately.
///
/// # Errors
///
/// Returns [`CommandError::Failed`] when the process exits non-zero, or
/// [`CommandError::Spawn`]/[`CommandError::Io`] when it cannot be run.
pub fn run_captured(command: &CommandLine) -> Result<CommandResult, CommandError> {
    let result = run_captured_unchecked(command)?;
    if result.success() {
        Ok(result)
    } else {
        Err(CommandError::Failed {
            command: command.rendered(),
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        })
    }
}

/// Runs a command to completion and returns the result regardless of exit
/// status. Callers that treat a non-zero exit as an expected no-op (remote
/// removal when no remote exists) use this variant.
///
/// # Errors
///
/// Returns [`CommandError::Spawn`] only when the process cannot be started.
pub fn run_captured_unchecked(command: &CommandLine) -> Result<CommandResult, CommandError> {
    debug!(command = %command.rendered(), "running captured command");
    let output = command
        .build()
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.rendered(),
            source,
        })?;

    Ok(CommandResult {
        exit_code: output.status.code().unwrap_or(NO_EXIT_CODE),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Runs a command to completion, forwarding merged stdout+stderr to `sink`
/// line-by-line as it is produced.
///
/// One reader thread per pipe pushes into the mutex-guarded sink; both are
/// joined before this function returns, so no process or thread outlives the
/// call.
///
/// # Errors
///
/// Returns [`CommandError::Failed`] on non-zero exit (stderr is empty in that
/// case since the output already went to the sink), or
/// [`CommandError::Spawn`]/[`CommandError::Io`] when the process cannot be
/// run or its output cannot be read.
pub fn run_streamed<W>(command: &CommandLine, sink: &mut W) -> Result<(), CommandError>
where
    W: Write + Send,
{
    debug!(command = %command.rendered(), "running streamed command");
    let rendered = command.rendered();
    let io_err = |source| CommandError::Io {
        command: rendered.clone(),
        source,
    };

    let mut child = command
        .build()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CommandError::Spawn {
            command: rendered.clone(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_err(std::io::Error::other("child stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_err(std::io::Error::other("child stderr not captured")))?;

    let guarded = Mutex::new(sink);
    let forwarded = std::thread::scope(|scope| {
        let out_handle = scope.spawn(|| pipe_lines(stdout, &guarded));
        let err_handle = scope.spawn(|| pipe_lines(stderr, &guarded));
        let out_result = out_handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdout reader panicked")));
        let err_result = err_handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stderr reader panicked")));
        out_result.and(err_result)
    });
    if let Err(source) = forwarded {
        // The child must not outlive the call even when the sink breaks.
        let _ = child.kill();
        let _ = child.wait();
        return Err(io_err(source));
    }

    let status = child.wait().map_err(io_err)?;
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Failed {
            command: rendered,
            exit_code: status.code().unwrap_or(NO_EXIT_CODE),
            stderr: String::new(),
        })
    }
}

fn pipe_lines<R, W>(pipe: R, sink: &Mutex<&mut W>) -> std::io::Result<()>
where
    R: Read,
    W: Write + Send,
{
    let mut reader = BufReader::new(pipe);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let mut guard = sink
            .lock()
            .map_err(|_| std::io::Error::other("output sink mutex poisoned"))?;
        guard.write_all(line.as_bytes())?;
    }
}

/// Shorthand for a `git` command line rooted at `repo`.
#[must_use]
pub fn git_in<I, S>(repo: &Path, args: I) -> CommandLine
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandLine::new("git").args(args).current_dir(repo)
}
