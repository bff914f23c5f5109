//! End-to-end tests for the merge-conflict workbench.
//!
//! These tests exercise the real [`GitBackend`] against local repositories
//! created in temp directories: diverging branches, conflicting merges,
//! resolution via the applicator, and merge completion / abort. No network
//! I/O.

use git2::{build::CheckoutBuilder, Repository};
use tempfile::TempDir;

use mergebench_core::backend::{GitBackend, MergeOutcome, RepoActivity, VcsBackend};
use mergebench_core::conflict::{
    ConflictParser, MergePhase, MergeStateTracker, ResolutionApplicator, ResolutionChoice,
};
use mergebench_core::errors::MergeError;

// ===========================================================================
// Helpers
// ===========================================================================

fn init_repo() -> (TempDir, GitBackend) {
    let dir = TempDir::new().unwrap();
    Repository::init(dir.path()).unwrap();
    let backend = GitBackend::open(dir.path(), "Test", "test@example.com").unwrap();
    (dir, backend)
}

fn commit_file(backend: &GitBackend, path: &str, content: &str, message: &str) -> String {
    backend.write_file(path, content).unwrap();
    backend.stage(path).unwrap();
    backend.commit(message).unwrap()
}

fn create_branch(dir: &TempDir, name: &str) {
    let repo = Repository::open(dir.path()).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(name, &head, false).unwrap();
}

fn checkout_branch(dir: &TempDir, name: &str) {
    let repo = Repository::open(dir.path()).unwrap();
    repo.set_head(&format!("refs/heads/{}", name)).unwrap();
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .unwrap();
}

/// Build a repo where `main_branch` and `feature` both edited `f1.txt` and
/// `f2.txt` from a common base. Leaves HEAD on the original branch.
fn diverged_repo() -> (TempDir, GitBackend) {
    let (dir, backend) = init_repo();
    commit_file(&backend, "f1.txt", "base one\n", "add f1");
    commit_file(&backend, "f2.txt", "base two\n", "add f2");
    let original = backend.current_branch().unwrap().unwrap();

    create_branch(&dir, "feature");
    checkout_branch(&dir, "feature");
    commit_file(&backend, "f1.txt", "theirs one\n", "feature f1");
    commit_file(&backend, "f2.txt", "theirs two\n", "feature f2");

    checkout_branch(&dir, &original);
    commit_file(&backend, "f1.txt", "ours one\n", "ours f1");
    commit_file(&backend, "f2.txt", "ours two\n", "ours f2");

    (dir, backend)
}

// ===========================================================================
// Merge outcomes
// ===========================================================================

#[test]
fn fast_forward_merge() {
    let (dir, backend) = init_repo();
    commit_file(&backend, "f.txt", "one\n", "init");
    let original = backend.current_branch().unwrap().unwrap();

    create_branch(&dir, "feature");
    checkout_branch(&dir, "feature");
    let feature_sha = commit_file(&backend, "f.txt", "two\n", "feature work");

    checkout_branch(&dir, &original);
    let mut tracker = MergeStateTracker::new(&backend);
    let outcome = tracker.begin_merge("feature", false, None).unwrap();

    assert_eq!(
        outcome,
        MergeOutcome::FastForward {
            new_head: feature_sha.clone()
        }
    );
    assert_eq!(backend.head_sha().unwrap(), feature_sha);
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);
    assert_eq!(
        backend.read_file("f.txt").unwrap().as_deref(),
        Some("two\n")
    );
}

#[test]
fn already_up_to_date() {
    let (dir, backend) = init_repo();
    commit_file(&backend, "f.txt", "one\n", "init");
    create_branch(&dir, "old");
    commit_file(&backend, "f.txt", "two\n", "more");

    let mut tracker = MergeStateTracker::new(&backend);
    let outcome = tracker.begin_merge("old", false, None).unwrap();
    assert_eq!(outcome, MergeOutcome::AlreadyUpToDate);
}

#[test]
fn ff_only_refuses_divergent_merge() {
    let (_dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    let outcome = tracker.begin_merge("feature", true, None).unwrap();
    assert!(matches!(outcome, MergeOutcome::Failed { .. }));
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);
}

#[test]
fn clean_merge_of_disjoint_edits() {
    let (dir, backend) = init_repo();
    commit_file(&backend, "a.txt", "alpha\n", "add a");
    commit_file(&backend, "b.txt", "beta\n", "add b");
    let original = backend.current_branch().unwrap().unwrap();

    create_branch(&dir, "feature");
    checkout_branch(&dir, "feature");
    commit_file(&backend, "a.txt", "alpha changed\n", "feature edit");

    checkout_branch(&dir, &original);
    commit_file(&backend, "b.txt", "beta changed\n", "local edit");

    let mut tracker = MergeStateTracker::new(&backend);
    let outcome = tracker
        .begin_merge("feature", false, Some("merge feature"))
        .unwrap();

    let new_head = match outcome {
        MergeOutcome::Success { new_head } => new_head,
        other => panic!("expected Success, got {:?}", other),
    };
    assert_eq!(backend.head_sha().unwrap(), new_head);
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);

    let repo = Repository::open(dir.path()).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 2);
    assert_eq!(head.message().unwrap(), "merge feature");
}

// ===========================================================================
// Conflict lifecycle
// ===========================================================================

#[test]
fn conflicting_merge_resolve_and_complete() {
    let (dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    let outcome = tracker.begin_merge("feature", false, None).unwrap();
    let paths = match outcome {
        MergeOutcome::Conflicting { paths } => paths,
        other => panic!("expected Conflicting, got {:?}", other),
    };
    assert_eq!(paths, vec!["f1.txt".to_string(), "f2.txt".to_string()]);
    assert_eq!(tracker.state().phase(), MergePhase::MergingWithConflicts);
    assert_eq!(backend.repository_state().unwrap(), RepoActivity::Merging);

    // The working tree now carries marker text for both files.
    let conflict1 = ConflictParser::load(&backend, "f1.txt").unwrap().unwrap();
    assert_eq!(conflict1.conflict_markers.len(), 1);
    assert_eq!(conflict1.ours_content, "ours one");
    assert_eq!(conflict1.theirs_content, "theirs one");

    ResolutionApplicator::apply(&backend, &conflict1, &ResolutionChoice::UseOurs).unwrap();
    tracker.refresh().unwrap();
    assert_eq!(
        tracker.state().conflicting_paths,
        ["f2.txt".to_string()].into_iter().collect()
    );

    let conflict2 = ConflictParser::load(&backend, "f2.txt").unwrap().unwrap();
    ResolutionApplicator::apply(&backend, &conflict2, &ResolutionChoice::UseTheirs).unwrap();
    tracker.refresh().unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::MergingResolved);

    let sha = tracker.complete("Merge commit").unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);
    assert_eq!(backend.repository_state().unwrap(), RepoActivity::Normal);
    assert_eq!(backend.head_sha().unwrap(), sha);

    // Merge commit has both parents; resolved contents landed.
    let repo = Repository::open(dir.path()).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 2);
    assert_eq!(
        backend.read_file("f1.txt").unwrap().as_deref(),
        Some("ours one")
    );
    assert_eq!(
        backend.read_file("f2.txt").unwrap().as_deref(),
        Some("theirs two")
    );
}

#[test]
fn complete_refused_while_conflicts_remain() {
    let (_dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    tracker.begin_merge("feature", false, None).unwrap();
    let head_before = backend.head_sha().unwrap();

    let result = tracker.complete("Merge commit");
    assert!(matches!(
        result,
        Err(MergeError::StillConflicting { remaining: 2 })
    ));

    // No commit was made; the merge is still in progress.
    assert_eq!(backend.head_sha().unwrap(), head_before);
    assert_eq!(backend.repository_state().unwrap(), RepoActivity::Merging);
}

#[test]
fn abort_restores_clean_tree() {
    let (_dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    tracker.begin_merge("feature", false, None).unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::MergingWithConflicts);

    tracker.abort().unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);
    assert_eq!(backend.repository_state().unwrap(), RepoActivity::Normal);
    assert!(backend.conflicting_paths().unwrap().is_empty());

    // Working tree is back to the pre-merge HEAD content.
    assert_eq!(
        backend.read_file("f1.txt").unwrap().as_deref(),
        Some("ours one\n")
    );
    assert_eq!(
        backend.read_file("f2.txt").unwrap().as_deref(),
        Some("ours two\n")
    );
}

#[test]
fn abort_after_all_conflicts_resolved() {
    let (_dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    tracker.begin_merge("feature", false, None).unwrap();
    let head_before = backend.head_sha().unwrap();
    for path in ["f1.txt", "f2.txt"] {
        let conflict = ConflictParser::load(&backend, path).unwrap().unwrap();
        ResolutionApplicator::apply(&backend, &conflict, &ResolutionChoice::UseTheirs).unwrap();
    }
    tracker.refresh().unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::MergingResolved);

    // Aborting at this point discards the staged resolutions too.
    tracker.abort().unwrap();
    assert_eq!(tracker.state().phase(), MergePhase::NotMerging);
    assert_eq!(backend.repository_state().unwrap(), RepoActivity::Normal);
    assert_eq!(backend.head_sha().unwrap(), head_before);
    assert_eq!(
        backend.read_file("f1.txt").unwrap().as_deref(),
        Some("ours one\n")
    );
    assert_eq!(
        backend.read_file("f2.txt").unwrap().as_deref(),
        Some("ours two\n")
    );
}

#[test]
fn complete_fails_on_unreadable_merge_head() {
    let (dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);

    tracker.begin_merge("feature", false, None).unwrap();
    for path in ["f1.txt", "f2.txt"] {
        let conflict = ConflictParser::load(&backend, path).unwrap().unwrap();
        ResolutionApplicator::apply(&backend, &conflict, &ResolutionChoice::UseOurs).unwrap();
    }
    let head_before = backend.head_sha().unwrap();

    // Clobber MERGE_HEAD so the merge parents cannot be read back.
    std::fs::write(dir.path().join(".git/MERGE_HEAD"), "not-a-commit-id\n").unwrap();

    // Completion must fail rather than record a single-parent commit that
    // silently drops the merged-in history.
    let result = tracker.complete("Merge commit");
    assert!(matches!(result, Err(MergeError::Backend(_))));
    assert_eq!(backend.head_sha().unwrap(), head_before);
}

#[test]
fn manual_edit_resolution_round_trip() {
    let (_dir, backend) = diverged_repo();
    let mut tracker = MergeStateTracker::new(&backend);
    tracker.begin_merge("feature", false, None).unwrap();

    let conflict = ConflictParser::load(&backend, "f1.txt").unwrap().unwrap();
    let merged = "ours one\ntheirs one\n".to_string();
    ResolutionApplicator::apply(&backend, &conflict, &ResolutionChoice::ManualEdit(merged))
        .unwrap();

    // Re-parsing the resolved file finds no regions.
    let reparsed = ConflictParser::load(&backend, "f1.txt").unwrap().unwrap();
    assert!(reparsed.conflict_markers.is_empty());
    assert_eq!(reparsed.ours_content, reparsed.theirs_content);

    tracker.refresh().unwrap();
    assert!(!tracker.state().conflicting_paths.contains("f1.txt"));
}

#[test]
fn load_missing_path_is_none() {
    let (_dir, backend) = init_repo();
    commit_file(&backend, "f.txt", "x\n", "init");
    assert!(ConflictParser::load(&backend, "gone.txt").unwrap().is_none());
}
