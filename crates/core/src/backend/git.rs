//! `git2`-backed implementation of [`VcsBackend`].

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use git2::{build::CheckoutBuilder, AnnotatedCommit, Repository, RepositoryState, Signature};
use tracing::{debug, info, instrument, warn};

use crate::errors::BackendError;

use super::{MergeOutcome, RepoActivity, VcsBackend};

/// Local Git repository access via `git2`.
pub struct GitBackend {
    repo: Repository,
    workdir: PathBuf,
    author_name: String,
    author_email: String,
}

impl GitBackend {
    /// Open an existing Git repository at `repo_path`.
    ///
    /// `author_name` / `author_email` are used as the signature for commits
    /// created through this backend.
    pub fn open<P: AsRef<Path>>(
        repo_path: P,
        author_name: &str,
        author_email: &str,
    ) -> Result<Self, BackendError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| BackendError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| BackendError::NoWorkingTree(path.display().to_string()))?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir,
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Short name of the current branch, or `None` on a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>, BackendError> {
        let head = self.repo.head()?;
        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// SHA of the commit HEAD points at.
    pub fn head_sha(&self) -> Result<String, BackendError> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn signature(&self) -> Result<Signature<'static>, BackendError> {
        Ok(Signature::now(&self.author_name, &self.author_email)?)
    }

    /// Resolve a repository-relative path against the working tree,
    /// rejecting anything that would land outside it.
    fn workdir_path(&self, path: &str) -> Result<PathBuf, BackendError> {
        let rel = Path::new(path);
        if rel.is_absolute() {
            return Err(BackendError::PathOutsideRepository(path.to_string()));
        }
        for component in rel.components() {
            if matches!(component, Component::ParentDir | Component::Prefix(_)) {
                return Err(BackendError::PathOutsideRepository(path.to_string()));
            }
        }
        Ok(self.workdir.join(rel))
    }

    /// Parents recorded in MERGE_HEAD, when a merge is being concluded.
    ///
    /// `mergehead_foreach` needs a mutable handle, so a scratch handle is
    /// opened; the shared backend surface stays immutable. A missing
    /// MERGE_HEAD means no merge is in progress and yields an empty list;
    /// any other failure (e.g. an unparsable oid) must propagate, or the
    /// merge commit would silently lose its second parent.
    fn merge_parents(&self) -> Result<Vec<git2::Oid>, BackendError> {
        let mut repo = Repository::open(&self.workdir)?;
        let mut oids = Vec::new();
        match repo.mergehead_foreach(|oid| {
            oids.push(*oid);
            true
        }) {
            Ok(()) => Ok(oids),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(Vec::new()),
            Err(e) => Err(BackendError::Git2Error(e)),
        }
    }

    fn resolve_annotated(&self, target_ref: &str) -> Option<AnnotatedCommit<'_>> {
        if let Ok(reference) = self.repo.resolve_reference_from_short_name(target_ref) {
            if let Ok(annotated) = self.repo.reference_to_annotated_commit(&reference) {
                return Some(annotated);
            }
        }
        let oid = self.repo.revparse_single(target_ref).ok()?.id();
        self.repo.find_annotated_commit(oid).ok()
    }

    fn try_merge(
        &self,
        annotated: &AnnotatedCommit<'_>,
        target_ref: &str,
        fast_forward_only: bool,
        message: Option<&str>,
    ) -> Result<MergeOutcome, BackendError> {
        let (analysis, _) = self.repo.merge_analysis(&[annotated])?;

        if analysis.is_up_to_date() {
            debug!("merge analysis: already up to date");
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        if analysis.is_fast_forward() {
            let target_oid = annotated.id();
            let head = self.repo.head()?;
            let head_name = head.name().unwrap_or("HEAD").to_string();
            let mut head_ref = self.repo.find_reference(&head_name)?;
            head_ref.set_target(target_oid, "mergebench: fast-forward merge")?;
            self.repo.set_head(&head_name)?;
            self.repo
                .checkout_head(Some(CheckoutBuilder::new().force()))?;
            info!(new_head = %target_oid, "fast-forward merge completed");
            return Ok(MergeOutcome::FastForward {
                new_head: target_oid.to_string(),
            });
        }

        if fast_forward_only {
            return Ok(MergeOutcome::Failed {
                reason: format!("merge of '{}' cannot fast-forward", target_ref),
            });
        }

        let mut checkout = CheckoutBuilder::new();
        checkout.allow_conflicts(true).conflict_style_merge(true);
        self.repo.merge(&[annotated], None, Some(&mut checkout))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            let mut paths = Vec::new();
            for entry in index.conflicts()? {
                let entry = entry?;
                if let Some(side) = entry.our.or(entry.their).or(entry.ancestor) {
                    paths.push(String::from_utf8_lossy(&side.path).into_owned());
                }
            }
            paths.sort();
            paths.dedup();
            warn!(count = paths.len(), "merge stopped with conflicts");
            return Ok(MergeOutcome::Conflicting { paths });
        }

        // Clean merge: create the merge commit right away.
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let head_commit = self.repo.head()?.peel_to_commit()?;
        let their_commit = self.repo.find_commit(annotated.id())?;
        let sig = self.signature()?;
        let default_message = format!("Merge '{}'", target_ref);
        let msg = message.unwrap_or(&default_message);
        let oid = self.repo.commit(
            Some("HEAD"),
            &sig,
            &sig,
            msg,
            &tree,
            &[&head_commit, &their_commit],
        )?;
        self.repo.cleanup_state()?;
        info!(new_head = %oid, "merge completed with new commit");
        Ok(MergeOutcome::Success {
            new_head: oid.to_string(),
        })
    }
}

impl VcsBackend for GitBackend {
    fn repository_state(&self) -> Result<RepoActivity, BackendError> {
        let activity = match self.repo.state() {
            RepositoryState::Clean => RepoActivity::Normal,
            RepositoryState::Merge => RepoActivity::Merging,
            _ => RepoActivity::Other,
        };
        debug!(?activity, "queried repository state");
        Ok(activity)
    }

    fn conflicting_paths(&self) -> Result<BTreeSet<String>, BackendError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let paths: BTreeSet<String> = statuses
            .iter()
            .filter(|entry| entry.status().is_conflicted())
            .filter_map(|entry| entry.path().map(|p| p.to_string()))
            .collect();
        debug!(count = paths.len(), "queried conflicting paths");
        Ok(paths)
    }

    #[instrument(skip(self, message))]
    fn merge(
        &self,
        target_ref: &str,
        fast_forward_only: bool,
        message: Option<&str>,
    ) -> Result<MergeOutcome, BackendError> {
        info!(target_ref, fast_forward_only, "merging");

        let annotated = match self.resolve_annotated(target_ref) {
            Some(a) => a,
            None => {
                return Ok(MergeOutcome::Failed {
                    reason: format!("ref '{}' not found", target_ref),
                })
            }
        };

        // git2 errors during the merge itself are part of the outcome
        // classification, not a backend failure.
        match self.try_merge(&annotated, target_ref, fast_forward_only, message) {
            Ok(outcome) => Ok(outcome),
            Err(BackendError::Git2Error(e)) => {
                warn!(error = %e, "merge command failed");
                Ok(MergeOutcome::Failed {
                    reason: e.message().to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    fn reset_hard(&self) -> Result<(), BackendError> {
        info!("hard reset to HEAD");
        let head_obj = self.repo.head()?.peel(git2::ObjectType::Commit)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(&head_obj, git2::ResetType::Hard, Some(&mut checkout))?;
        self.repo.cleanup_state()?;
        debug!("reset completed");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, BackendError> {
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let sig = self.signature()?;

        let head_commit = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };

        let mut parents = Vec::new();
        if let Some(commit) = head_commit {
            parents.push(commit);
        }
        for oid in self.merge_parents()? {
            parents.push(self.repo.find_commit(oid)?);
        }
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;
        self.repo.cleanup_state()?;
        info!(sha = %oid, "created commit");
        Ok(oid.to_string())
    }

    fn stage(&self, path: &str) -> Result<(), BackendError> {
        // Validate before touching the index.
        self.workdir_path(path)?;
        let mut index = self.repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;
        debug!(path, "staged path");
        Ok(())
    }

    fn read_file(&self, path: &str) -> Result<Option<String>, BackendError> {
        let full = self.workdir_path(path)?;
        if !full.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(full)?))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<(), BackendError> {
        let full = self.workdir_path(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, content)?;
        debug!(path, "wrote working-tree file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_backend(dir: &Path) -> GitBackend {
        Repository::init(dir).unwrap();
        GitBackend::open(dir, "Test", "test@test.com").unwrap()
    }

    #[test]
    fn test_repo_not_found() {
        assert!(matches!(
            GitBackend::open("/nonexistent", "T", "t@t.com"),
            Err(BackendError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_write_read_stage_commit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = init_backend(dir.path());

        backend.write_file("hello.txt", "hello world\n").unwrap();
        assert_eq!(
            backend.read_file("hello.txt").unwrap().as_deref(),
            Some("hello world\n")
        );
        backend.stage("hello.txt").unwrap();
        let sha = backend.commit("initial commit").unwrap();
        assert_eq!(backend.head_sha().unwrap(), sha);
        assert_eq!(
            backend.repository_state().unwrap(),
            RepoActivity::Normal
        );
        assert!(backend.conflicting_paths().unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = init_backend(dir.path());
        assert!(backend.read_file("nope.txt").unwrap().is_none());
    }

    #[test]
    fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = init_backend(dir.path());
        assert!(matches!(
            backend.read_file("../outside.txt"),
            Err(BackendError::PathOutsideRepository(_))
        ));
        assert!(matches!(
            backend.write_file("/etc/hosts", "x"),
            Err(BackendError::PathOutsideRepository(_))
        ));
    }

    #[test]
    fn test_merge_unknown_ref_is_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let backend = init_backend(dir.path());
        backend.write_file("f.txt", "c\n").unwrap();
        backend.stage("f.txt").unwrap();
        backend.commit("init").unwrap();

        let outcome = backend.merge("no-such-branch", false, None).unwrap();
        assert!(matches!(outcome, MergeOutcome::Failed { .. }));
    }
}
