//! Workbench configuration.
//!
//! A small TOML config covering the repository location, the committer
//! identity used for merge commits, and merge defaults. The config is
//! always passed explicitly into the components that need it; there is no
//! ambient singleton.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Configuration for the merge-conflict workbench.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// General workbench settings.
    #[serde(default)]
    pub workbench: WorkbenchSection,

    /// Identity used for merge commits.
    #[serde(default)]
    pub author: AuthorConfig,

    /// Merge behaviour options.
    #[serde(default)]
    pub merge: MergeConfig,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            workbench: WorkbenchSection::default(),
            author: AuthorConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

/// General workbench settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchSection {
    /// Default repository path when none is given on the command line.
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WorkbenchSection {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            log_level: default_log_level(),
        }
    }
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "warn".into()
}

/// Committer identity for merge commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorConfig {
    /// Git author/committer name.
    #[serde(default = "default_author_name")]
    pub name: String,

    /// Git author/committer email.
    #[serde(default = "default_author_email")]
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: default_author_name(),
            email: default_author_email(),
        }
    }
}

fn default_author_name() -> String {
    "mergebench".into()
}

fn default_author_email() -> String {
    "mergebench@localhost".into()
}

/// Merge behaviour options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Message used for merge commits when none is supplied.
    #[serde(default = "default_merge_message")]
    pub default_message: String,

    /// Refuse merges that cannot fast-forward.
    #[serde(default)]
    pub fast_forward_only: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_message: default_merge_message(),
            fast_forward_only: false,
        }
    }
}

fn default_merge_message() -> String {
    "Merge commit".into()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl WorkbenchConfig {
    /// Load a [`WorkbenchConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading workbench configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: WorkbenchConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("workbench configuration parsed successfully");
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if the file exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            debug!("no config file present, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate that all fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.author.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "author.name".into(),
                detail: "author name must not be empty".into(),
            });
        }
        if self.author.email.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "author.email".into(),
                detail: "author email must not be empty".into(),
            });
        }
        if self.merge.default_message.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "merge.default_message".into(),
                detail: "default merge message must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# mergebench configuration

[workbench]
repository = "."
log_level = "warn"

[author]
name = "Your Name"
email = "you@example.com"

[merge]
default_message = "Merge commit"
fast_forward_only = false
"#
    }
}
