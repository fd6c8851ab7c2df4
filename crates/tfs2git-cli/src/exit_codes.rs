//! Process exit codes for the tfs2git CLI.
//!
//! Zero covers every completed run — per-branch FAIL records are data in the
//! report, never a process-level error — and clean operator cancellations.
//! Non-zero is reserved for precondition failures and invalid input, all of
//! which occur before any branch is pushed or abort the run outright.

/// Exit code constants.
pub mod codes {
    /// Completed run (including partial branch failures) or clean
    /// cancellation.
    pub const SUCCESS: u8 = 0;

    /// Missing external tool, non-empty clone directory, empty branch list,
    /// failed import, missing required input, or unwritable report.
    pub const PRECONDITION_FAILURE: u8 = 1;

    /// Unparseable or out-of-range branch selection input.
    pub const INVALID_ARGS: u8 = 2;
}
