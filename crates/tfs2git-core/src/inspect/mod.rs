//! Repository inspection.
//!
//! Derives verifiable facts about a branch reference in a local repository
//! copy: file count, commit checksum, and tree checksum. A commit checksum
//! alone is an imprecise migration proof because bridging tools may rewrite
//! commit metadata; the tree checksum plus an independent file count confirm
//! content equivalence even when commit identifiers legitimately differ, and
//! all three signals together make tampering or partial pushes detectable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::exec::{self, CommandError};

/// The verifiable state of one branch at one point in time.
///
/// Two snapshots of the same branch taken before and after a push are
/// compared field-by-field for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    /// Branch reference the snapshot was taken from.
    pub branch: String,
    /// Number of file paths reachable from the branch tree. Zero is valid.
    pub file_count: usize,
    /// Full hex commit identifier the branch resolves to.
    pub commit_checksum: String,
    /// Full hex identifier of the branch's content tree.
    pub tree_checksum: String,
}

/// Reads branch facts out of a local repository via git plumbing.
#[derive(Debug, Clone)]
pub struct RepoInspector {
    repo: PathBuf,
}

impl RepoInspector {
    /// Creates an inspector bound to the repository at `repo`.
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    /// The repository path this inspector reads from.
    #[must_use]
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Counts all file paths recursively reachable from `refname`'s tree.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when git cannot list the tree (unknown ref,
    /// broken repository).
    pub fn file_count(&self, refname: &str) -> Result<usize, CommandError> {
        let result = exec::run_captured(&exec::git_in(
            &self.repo,
            ["ls-tree", "-r", "--name-only", refname],
        ))?;
        Ok(result
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count())
    }

    /// Resolves `refname` to its immutable commit identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the ref does not resolve to a commit.
    pub fn commit_checksum(&self, refname: &str) -> Result<String, CommandError> {
        self.rev_parse(&format!("{refname}^{{commit}}"))
    }

    /// Resolves `refname` to its content-tree identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the ref does not resolve to a tree.
    pub fn tree_checksum(&self, refname: &str) -> Result<String, CommandError> {
        self.rev_parse(&format!("{refname}^{{tree}}"))
    }

    /// Composes file count, commit checksum, and tree checksum into one
    /// snapshot. The three reads are sequential against the same local state;
    /// no concurrent mutation is expected during a single snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when any of the three reads fails.
    pub fn snapshot(&self, refname: &str) -> Result<BranchSnapshot, CommandError> {
        Ok(BranchSnapshot {
            branch: refname.to_string(),
            file_count: self.file_count(refname)?,
            commit_checksum: self.commit_checksum(refname)?,
            tree_checksum: self.tree_checksum(refname)?,
        })
    }

    fn rev_parse(&self, spec: &str) -> Result<String, CommandError> {
        let result = exec::run_captured(&exec::git_in(&self.repo, ["rev-parse", spec]))?;
        Ok(result.stdout.trim().to_string())
    }
}
