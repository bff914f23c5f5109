//! Merge session tracking.
//!
//! [`MergeStateTracker`] exposes a pollable, process-local view of the
//! repository's merge lifecycle and mediates the begin / abort / complete
//! transitions. The state is never persisted; it is always recomputed from
//! the backend, and the backend remains authoritative at every decision
//! point.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{MergeOutcome, RepoActivity, VcsBackend};
use crate::errors::MergeError;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle phase of the merge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    /// No merge in progress.
    NotMerging,
    /// Merge in progress with unresolved conflicting paths.
    MergingWithConflicts,
    /// All conflicts resolved; the merge commit is still pending.
    MergingResolved,
}

/// Process-local reflection of the repository's merge state.
///
/// Invariant: `is_merging == false` implies `conflicting_paths` is empty.
/// The converse does not hold -- a merge can be active with zero remaining
/// conflicts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSessionState {
    pub is_merging: bool,
    pub conflicting_paths: BTreeSet<String>,
}

impl MergeSessionState {
    pub fn phase(&self) -> MergePhase {
        if !self.is_merging {
            MergePhase::NotMerging
        } else if self.conflicting_paths.is_empty() {
            MergePhase::MergingResolved
        } else {
            MergePhase::MergingWithConflicts
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Tracks merge lifecycle state against a [`VcsBackend`].
pub struct MergeStateTracker<'a, B: VcsBackend> {
    backend: &'a B,
    state: MergeSessionState,
}

impl<'a, B: VcsBackend> MergeStateTracker<'a, B> {
    /// Create a tracker in the `NotMerging` state. Call [`refresh`]
    /// (or [`begin_merge`]) to derive the real state from the backend.
    ///
    /// [`refresh`]: Self::refresh
    /// [`begin_merge`]: Self::begin_merge
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            state: MergeSessionState::default(),
        }
    }

    /// The last derived state. May be stale until the next [`Self::refresh`].
    pub fn state(&self) -> &MergeSessionState {
        &self.state
    }

    /// Re-derive the session state from the backend. Idempotent.
    pub fn refresh(&mut self) -> Result<&MergeSessionState, MergeError> {
        let is_merging = matches!(self.backend.repository_state()?, RepoActivity::Merging);
        // The invariant demands an empty set when no merge is active, so the
        // status query is only consulted mid-merge.
        let conflicting_paths = if is_merging {
            self.backend.conflicting_paths()?
        } else {
            BTreeSet::new()
        };

        self.state = MergeSessionState {
            is_merging,
            conflicting_paths,
        };
        debug!(
            is_merging,
            conflicts = self.state.conflicting_paths.len(),
            "merge state refreshed"
        );
        Ok(&self.state)
    }

    /// Merge `target_ref` into the current branch.
    ///
    /// On a `Conflicting` outcome the session transitions to
    /// `MergingWithConflicts`, seeded from the outcome's path list; every
    /// other outcome triggers a [`Self::refresh`].
    pub fn begin_merge(
        &mut self,
        target_ref: &str,
        fast_forward_only: bool,
        message: Option<&str>,
    ) -> Result<MergeOutcome, MergeError> {
        info!(target_ref, fast_forward_only, "beginning merge");
        let outcome = self
            .backend
            .merge(target_ref, fast_forward_only, message)?;

        match &outcome {
            MergeOutcome::Conflicting { paths } => {
                self.state = MergeSessionState {
                    is_merging: true,
                    conflicting_paths: paths.iter().cloned().collect(),
                };
                warn!(conflicts = paths.len(), "merge has conflicts");
            }
            _ => {
                self.refresh()?;
            }
        }
        Ok(outcome)
    }

    /// Abort the in-progress merge with a hard reset to the pre-merge HEAD.
    ///
    /// Destructive: discards all merge-in-progress edits, staged or not.
    /// Fails with [`MergeError::NotMerging`] when no merge is active.
    pub fn abort(&mut self) -> Result<(), MergeError> {
        if !self.state.is_merging {
            return Err(MergeError::NotMerging);
        }
        info!("aborting merge");
        self.backend.reset_hard()?;
        self.state = MergeSessionState::default();
        Ok(())
    }

    /// Create the merge commit once every conflict has been resolved.
    ///
    /// The backend's conflict set is re-checked immediately before
    /// committing; local state is not trusted. Fails with
    /// [`MergeError::StillConflicting`] if any path remains, without
    /// committing anything.
    pub fn complete(&mut self, message: &str) -> Result<String, MergeError> {
        if !self.state.is_merging {
            return Err(MergeError::NotMerging);
        }

        let remaining = self.backend.conflicting_paths()?;
        if !remaining.is_empty() {
            warn!(remaining = remaining.len(), "complete refused, conflicts remain");
            let count = remaining.len();
            self.state.conflicting_paths = remaining;
            return Err(MergeError::StillConflicting { remaining: count });
        }

        let sha = self.backend.commit(message)?;
        info!(sha = %sha, "merge completed");
        self.state = MergeSessionState::default();
        Ok(sha)
    }
}
