//! tfs2git-core - TFS to Git migration engine
//!
//! Library crate backing the `tfs2git` CLI. It drives a one-shot migration of
//! a TFS repository into a Git remote through the `git-tfs` bridge and
//! verifies, per branch, that the pushed history and content are bit-identical
//! to the imported copy.
//!
//! The engine is strictly sequential and never terminates the process itself;
//! every failure surfaces as a typed error for the caller to map to an exit
//! code. Interactive concerns (prompting, confirmation) are injected by the
//! caller so the state machine runs headless in tests.

pub mod exec;
pub mod inspect;
pub mod migration;
pub mod report;
pub mod selection;
