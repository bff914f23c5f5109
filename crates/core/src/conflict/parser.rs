//! Conflict-marker parsing.
//!
//! Scans working-tree file text for Git's `<<<<<<<` / `=======` / `>>>>>>>`
//! marker triplets and produces a [`ConflictFile`]: the ordered conflict
//! regions plus full "ours" and "theirs" reconstructions of the file.
//!
//! Parsing never hard-errors. Malformed marker sequences degrade: an
//! unterminated region is simply absent from the output, with its consumed
//! lines still routed through the state machine.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::VcsBackend;
use crate::errors::BackendError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One textually-delimited conflicting hunk within a file.
///
/// `start_line` / `end_line` are the zero-based indices of the opening and
/// closing marker lines, both inclusive. The line vectors never include the
/// marker lines themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub ours_lines: Vec<String>,
    pub theirs_lines: Vec<String>,
    /// Base section for diff3-style markers. Not populated: only the
    /// conventional two-side marker style is recognized.
    pub base_lines: Option<Vec<String>>,
}

/// The parsed view of one conflicted path.
///
/// A pure, ephemeral value object: recomputed from the working-tree file on
/// every load, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictFile {
    /// Repository-relative path.
    pub path: String,
    /// The file as it would read with every "theirs" hunk discarded and
    /// all marker lines removed.
    pub ours_content: String,
    /// The file as it would read with every "ours" hunk discarded.
    pub theirs_content: String,
    /// Placeholder for a future three-way base reconstruction.
    pub base_content: Option<String>,
    /// Regions in order of appearance. Empty if the file has no (well
    /// formed) markers.
    pub conflict_markers: Vec<ConflictRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InOurs,
    InTheirs,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Stateless conflict-marker parser.
pub struct ConflictParser;

impl ConflictParser {
    /// Parse raw file text into a [`ConflictFile`].
    ///
    /// Single sequential pass with a three-state machine per region:
    /// - `<<<<<<<` enters the "ours" span (from any state; re-entry
    ///   restarts the region).
    /// - `=======` switches to the "theirs" span only while in "ours";
    ///   anywhere else it is ordinary content, so files that legitimately
    ///   contain a raw `=======` line are not misparsed.
    /// - `>>>>>>>` closes the region only while in "theirs".
    ///
    /// Both reconstructions are trimmed of trailing whitespace only;
    /// internal blank lines are preserved.
    pub fn parse(path: &str, raw_text: &str) -> ConflictFile {
        let mut regions = Vec::new();
        let mut ours_out: Vec<&str> = Vec::new();
        let mut theirs_out: Vec<&str> = Vec::new();
        let mut ours_buf: Vec<String> = Vec::new();
        let mut theirs_buf: Vec<String> = Vec::new();
        let mut state = State::Outside;
        let mut region_start = 0usize;

        for (index, line) in raw_text.lines().enumerate() {
            if line.starts_with("<<<<<<<") {
                state = State::InOurs;
                region_start = index;
                ours_buf.clear();
                theirs_buf.clear();
                continue;
            }
            if line.starts_with("=======") && state == State::InOurs {
                state = State::InTheirs;
                theirs_buf.clear();
                continue;
            }
            if line.starts_with(">>>>>>>") && state == State::InTheirs {
                state = State::Outside;
                regions.push(ConflictRegion {
                    start_line: region_start,
                    end_line: index,
                    ours_lines: std::mem::take(&mut ours_buf),
                    theirs_lines: std::mem::take(&mut theirs_buf),
                    base_lines: None,
                });
                continue;
            }

            match state {
                State::Outside => {
                    ours_out.push(line);
                    theirs_out.push(line);
                }
                State::InOurs => {
                    ours_out.push(line);
                    ours_buf.push(line.to_string());
                }
                State::InTheirs => {
                    theirs_out.push(line);
                    theirs_buf.push(line.to_string());
                }
            }
        }

        if state != State::Outside {
            debug!(path, "unterminated conflict region dropped");
        }

        ConflictFile {
            path: path.to_string(),
            ours_content: ours_out.join("\n").trim_end().to_string(),
            theirs_content: theirs_out.join("\n").trim_end().to_string(),
            base_content: None,
            conflict_markers: regions,
        }
    }

    /// Read and parse one conflicted path from the working tree.
    ///
    /// A missing or unreadable file yields `Ok(None)`: there is nothing to
    /// resolve for that path (it may have been resolved externally).
    pub fn load<B: VcsBackend>(
        backend: &B,
        path: &str,
    ) -> Result<Option<ConflictFile>, BackendError> {
        match backend.read_file(path) {
            Ok(Some(text)) => Ok(Some(Self::parse(path, &text))),
            Ok(None) => {
                debug!(path, "conflict file missing, nothing to resolve");
                Ok(None)
            }
            Err(BackendError::IoError(e)) => {
                warn!(path, error = %e, "conflict file unreadable, treating as absent");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
