//! mergebench core library.
//!
//! This crate provides the foundational components for the merge-conflict
//! workbench: configuration, the narrow version-control backend interface
//! (with a `git2` implementation), conflict-marker parsing, merge session
//! tracking, and resolution application.

pub mod backend;
pub mod config;
pub mod conflict;
pub mod errors;

// Re-exports for convenience.
pub use backend::{GitBackend, MergeOutcome, RepoActivity, VcsBackend};
pub use config::WorkbenchConfig;
pub use conflict::{
    ConflictFile, ConflictParser, ConflictRegion, MergePhase, MergeSessionState,
    MergeStateTracker, ResolutionApplicator, ResolutionChoice,
};
