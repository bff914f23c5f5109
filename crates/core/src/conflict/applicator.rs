//! Resolution application.
//!
//! Takes a user's [`ResolutionChoice`] for one conflicting path and makes
//! it durable: full-file overwrite of the working-tree file, then a stage
//! of the path so the next status query no longer reports it conflicting.
//!
//! The applicator never touches tracker state; callers refresh the
//! [`MergeStateTracker`](super::MergeStateTracker) after a successful apply.

use tracing::{debug, info};

use crate::backend::VcsBackend;
use crate::errors::MergeError;

use super::parser::ConflictFile;

/// A resolution strategy for one conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionChoice {
    /// Keep the current branch's reconstruction.
    UseOurs,
    /// Keep the incoming branch's reconstruction.
    UseTheirs,
    /// Use user-edited text verbatim.
    ManualEdit(String),
}

/// Stateless resolution operations.
pub struct ResolutionApplicator;

impl ResolutionApplicator {
    /// Apply `choice` to the path described by `conflict`.
    ///
    /// `ManualEdit` content is rejected if it still contains conflict-marker
    /// lines; the ours/theirs reconstructions are marker-free by
    /// construction and are not re-checked.
    pub fn apply<B: VcsBackend>(
        backend: &B,
        conflict: &ConflictFile,
        choice: &ResolutionChoice,
    ) -> Result<(), MergeError> {
        let resolved: &str = match choice {
            ResolutionChoice::UseOurs => &conflict.ours_content,
            ResolutionChoice::UseTheirs => &conflict.theirs_content,
            ResolutionChoice::ManualEdit(text) => {
                if let Some(line) = find_marker_line(text) {
                    return Err(MergeError::MarkersPresent {
                        path: conflict.path.clone(),
                        line,
                    });
                }
                text
            }
        };

        backend.write_file(&conflict.path, resolved)?;
        backend.stage(&conflict.path)?;
        info!(path = %conflict.path, choice = choice_name(choice), "resolution applied");
        Ok(())
    }
}

fn choice_name(choice: &ResolutionChoice) -> &'static str {
    match choice {
        ResolutionChoice::UseOurs => "ours",
        ResolutionChoice::UseTheirs => "theirs",
        ResolutionChoice::ManualEdit(_) => "manual",
    }
}

/// Zero-based index of the first conflict-marker line, if any.
fn find_marker_line(text: &str) -> Option<usize> {
    let found = text.lines().position(|line| {
        line.starts_with("<<<<<<<") || line.starts_with("=======") || line.starts_with(">>>>>>>")
    });
    if let Some(line) = found {
        debug!(line, "residual conflict marker in manual edit");
    }
    found
}
