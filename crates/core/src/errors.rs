//! Error types for the mergebench core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors from the version-control backend (git2 and working-tree I/O).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// The repository has no working tree (bare repository).
    #[error("repository at '{0}' has no working tree")]
    NoWorkingTree(String),

    /// A relative path resolved outside the repository root.
    #[error("path '{0}' escapes the repository root")]
    PathOutsideRepository(String),

    /// Generic I/O wrapper.
    #[error("backend I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Merge session errors
// ---------------------------------------------------------------------------

/// Errors from the merge session subsystem (tracker and applicator).
#[derive(Debug, Error)]
pub enum MergeError {
    /// An operation that requires an active merge was invoked without one.
    #[error("no merge is in progress")]
    NotMerging,

    /// `complete()` found unresolved conflicts at commit time.
    #[error("{remaining} conflicting path(s) still unresolved")]
    StillConflicting { remaining: usize },

    /// A manual-edit resolution still contains conflict-marker lines.
    #[error("resolution for '{path}' still contains a conflict marker at line {line}")]
    MarkersPresent { path: String, line: usize },

    /// Underlying backend failure.
    #[error("merge backend error: {0}")]
    Backend(#[from] BackendError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
