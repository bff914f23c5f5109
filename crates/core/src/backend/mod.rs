//! Version-control backend interface.
//!
//! The workbench needs only a narrow slice of a full VCS command surface:
//! the merge-state predicate, the conflicting-path set, merge / reset /
//! commit / stage commands, and working-tree file access. [`VcsBackend`]
//! captures exactly that slice; [`GitBackend`] implements it over `git2`.

pub mod git;

pub use git::GitBackend;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::BackendError;

/// Classification of the repository's current interactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoActivity {
    /// No special operation in progress.
    Normal,
    /// An interactive merge is in progress (conflicted or resolved but
    /// uncommitted).
    Merging,
    /// Some other interactive state (rebase, cherry-pick, ...).
    Other,
}

/// Outcome of a merge command.
///
/// A closed enumeration: every merge invocation maps to exactly one of
/// these variants. Command-level failures (unknown ref, dirty tree) are
/// reported as [`MergeOutcome::Failed`] rather than an `Err`, so callers
/// can treat the outcome set exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// HEAD already contains the target; nothing to do.
    AlreadyUpToDate,
    /// The branch pointer was advanced without a new commit.
    FastForward { new_head: String },
    /// A merge commit was created with no conflicts.
    Success { new_head: String },
    /// The merge stopped with conflicts in the working tree and index.
    Conflicting { paths: Vec<String> },
    /// The merge could not be performed.
    Failed { reason: String },
}

/// The capability surface the conflict workbench consumes.
///
/// File paths are repository-relative. Implementations are expected to
/// serialize index mutations per repository; callers must not assume two
/// concurrent `stage` calls complete atomically relative to each other.
pub trait VcsBackend {
    /// Classify the repository's current interactive state.
    fn repository_state(&self) -> Result<RepoActivity, BackendError>;

    /// The set of paths the status query currently reports as conflicting.
    fn conflicting_paths(&self) -> Result<BTreeSet<String>, BackendError>;

    /// Merge `target_ref` into the current branch.
    fn merge(
        &self,
        target_ref: &str,
        fast_forward_only: bool,
        message: Option<&str>,
    ) -> Result<MergeOutcome, BackendError>;

    /// Hard reset working tree and index to HEAD, clearing any merge state.
    /// Destructive: discards all uncommitted edits, staged or not.
    fn reset_hard(&self) -> Result<(), BackendError>;

    /// Commit the current index. During a merge this produces the merge
    /// commit (HEAD plus MERGE_HEAD parents) and clears merge state.
    /// Returns the new commit SHA.
    fn commit(&self, message: &str) -> Result<String, BackendError>;

    /// Stage one path so it is no longer reported as conflicting.
    fn stage(&self, path: &str) -> Result<(), BackendError>;

    /// Read a working-tree file. `Ok(None)` if the file does not exist.
    fn read_file(&self, path: &str) -> Result<Option<String>, BackendError>;

    /// Overwrite a working-tree file in full.
    fn write_file(&self, path: &str, content: &str) -> Result<(), BackendError>;
}
