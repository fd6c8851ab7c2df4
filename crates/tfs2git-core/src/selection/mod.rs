//! Branch selection policy.
//!
//! Turns the enumerated branch list plus an operator directive into the
//! ordered subset to migrate. Enumeration order is significant: `First(n)`
//! means the first `n` branches as the underlying tool listed them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator directive for which branches to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionDirective {
    /// Push every enumerated branch, in enumeration order.
    All,
    /// Push the first `n` enumerated branches.
    First(usize),
    /// Stop the migration before any push happens. A deliberate operator
    /// exit, handled by the orchestrator as a clean cancellation.
    Abort,
}

/// Errors from applying a selection directive.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    /// `First(n)` with `n` outside `1..=len`.
    #[error("branch count {requested} is out of range (valid: 1-{available})")]
    OutOfRange {
        /// The count the operator asked for.
        requested: usize,
        /// How many branches were enumerated.
        available: usize,
    },
}

/// Applies `directive` to the enumerated `branches`, preserving input order.
///
/// `Abort` is decided by the orchestrator before selection runs; if it does
/// reach here it selects nothing.
///
/// # Errors
///
/// Returns [`SelectionError::OutOfRange`] for `First(n)` when `n < 1` or
/// `n > branches.len()`. The input is never modified.
pub fn select(
    branches: &[String],
    directive: SelectionDirective,
) -> Result<Vec<String>, SelectionError> {
    match directive {
        SelectionDirective::All => Ok(branches.to_vec()),
        SelectionDirective::First(n) => {
            if n < 1 || n > branches.len() {
                return Err(SelectionError::OutOfRange {
                    requested: n,
                    available: branches.len(),
                });
            }
            Ok(branches[..n].to_vec())
        },
        SelectionDirective::Abort => Ok(Vec::new()),
    }
}
