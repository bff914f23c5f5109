//! Merge-conflict workbench.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parsing** -- extracting structured conflict regions and the
//!    "ours" / "theirs" whole-file reconstructions from marker text.
//! 2. **Tracking** -- reflecting the repository's merge lifecycle and
//!    mediating begin / abort / complete transitions.
//! 3. **Resolution** -- writing a chosen resolution back to the working
//!    tree and re-staging the path.

pub mod applicator;
pub mod parser;
pub mod tracker;

pub use applicator::{ResolutionApplicator, ResolutionChoice};
pub use parser::{ConflictFile, ConflictParser, ConflictRegion};
pub use tracker::{MergePhase, MergeSessionState, MergeStateTracker};
