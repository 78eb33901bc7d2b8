//! Conflict handling: the awaiting-user state, manual continue, abort, and
//! automatic recovery through the resolution cache.

mod common;

use common::{commit_file, git, merge_on_remote, setup_remote};
use ripple_cli::config::Settings;
use ripple_cli::git::GitRepository;
use ripple_cli::stack::{MetadataStore, Stack, StackSet};
use ripple_cli::sync::{MergedEvent, SyncEngine, SyncOutcome, SyncPhase, SyncStateFile};
use std::path::Path;

/// A two-branch stack where replaying b onto the post-merge main conflicts:
/// a rewrites conflict.txt, b rewrites it again, and main gets a competing
/// edit after a merges.
fn setup_conflicting_stack(remote: &common::TestRemote, rerere_enabled: bool) -> MetadataStore {
    let work = &remote.work;
    commit_file(work, "conflict.txt", "original\n", "Seed conflict file");
    git(work, &["push", "origin", "main"]);

    git(work, &["checkout", "-b", "a"]);
    commit_file(work, "conflict.txt", "from-a\n", "Rewrite in a");
    git(work, &["push", "-u", "origin", "a"]);

    git(work, &["checkout", "-b", "b"]);
    commit_file(work, "conflict.txt", "from-b\n", "Rewrite in b");
    git(work, &["push", "-u", "origin", "b"]);

    // PR for a merges, then main takes a competing edit to the same file
    merge_on_remote(&remote.other, "a");
    commit_file(&remote.other, "conflict.txt", "hotfix\n", "Competing hotfix");
    git(&remote.other, &["push", "origin", "main"]);

    let mut settings = Settings::default();
    settings.rerere.enabled = rerere_enabled;

    let store = MetadataStore::new(work);
    let mut set = StackSet::new(settings);
    let mut stack = Stack::new("feature".to_string(), "main".to_string());
    stack.push_branch("a".to_string()).unwrap();
    stack.push_branch("b".to_string()).unwrap();
    set.add_stack(stack).unwrap();
    store.save(&set).unwrap();
    store
}

fn merged_event_a() -> MergedEvent {
    MergedEvent {
        stack_name: "feature".to_string(),
        branch: "a".to_string(),
        pr_number: 7,
        child_branches: vec!["b".to_string()],
    }
}

fn resolve_conflict(work: &Path, content: &str) {
    std::fs::write(work.join("conflict.txt"), content).unwrap();
    git(work, &["add", "conflict.txt"]);
}

#[test]
fn uncovered_conflict_reaches_awaiting_user_and_leaves_rebase_open() {
    let remote = setup_remote();
    let store = setup_conflicting_stack(&remote, false);

    git(&remote.work, &["checkout", "b"]);

    let repo = GitRepository::open(&remote.work).unwrap();
    let mut engine = SyncEngine::new(&repo, &store).unwrap();

    let outcome = engine.run(&merged_event_a()).unwrap();
    match outcome {
        SyncOutcome::AwaitingUser {
            conflicted_files,
            auto_resolved_files,
        } => {
            assert_eq!(conflicted_files, vec!["conflict.txt"]);
            assert!(auto_resolved_files.is_empty());
        }
        other => panic!("Expected AwaitingUser, got {other:?}"),
    }

    // The rebase is deliberately left open for manual resolution
    assert!(repo.rebase_in_progress());
    assert!(SyncStateFile::exists(&remote.work));

    // Metadata is untouched until the success path
    let set = store.load().unwrap();
    assert_eq!(set.get_stack("feature").unwrap().branches, vec!["a", "b"]);

    // A second sync is rejected while this one is outstanding
    let mut second = SyncEngine::new(&repo, &store).unwrap();
    assert!(second.run(&merged_event_a()).is_err());
}

#[test]
fn abort_restores_original_branch_and_metadata() {
    let remote = setup_remote();
    let store = setup_conflicting_stack(&remote, false);

    git(&remote.work, &["checkout", "b"]);

    let repo = GitRepository::open(&remote.work).unwrap();
    let mut engine = SyncEngine::new(&repo, &store).unwrap();
    let outcome = engine.run(&merged_event_a()).unwrap();
    assert!(matches!(outcome, SyncOutcome::AwaitingUser { .. }));

    engine.abort().unwrap();

    assert!(!repo.rebase_in_progress());
    assert!(!SyncStateFile::exists(&remote.work));
    assert_eq!(repo.current_branch().unwrap(), "b");

    // Removal only happens on the success path
    let set = store.load().unwrap();
    assert_eq!(set.get_stack("feature").unwrap().branches, vec!["a", "b"]);
    assert!(repo.branch_exists("a"));
}

#[test]
fn manual_resolution_then_resume_completes_the_sync() {
    let remote = setup_remote();
    let store = setup_conflicting_stack(&remote, false);

    git(&remote.work, &["checkout", "b"]);

    let repo = GitRepository::open(&remote.work).unwrap();
    let mut engine = SyncEngine::new(&repo, &store).unwrap();
    let outcome = engine.run(&merged_event_a()).unwrap();
    assert!(matches!(outcome, SyncOutcome::AwaitingUser { .. }));

    // The user resolves and stages, then re-invokes the engine
    resolve_conflict(&remote.work, "resolved\n");
    let outcome = engine.resume().unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed));

    assert!(!repo.rebase_in_progress());
    assert!(!SyncStateFile::exists(&remote.work));
    assert_eq!(repo.current_branch().unwrap(), "b");

    let set = store.load().unwrap();
    assert_eq!(set.get_stack("feature").unwrap().branches, vec!["b"]);
    assert!(!repo.branch_exists("a"));

    let content = std::fs::read_to_string(remote.work.join("conflict.txt")).unwrap();
    assert_eq!(content, "resolved\n");
}

#[test]
fn sequential_covered_conflicts_converge_without_user() {
    let remote = setup_remote();
    let work = &remote.work;

    commit_file(work, "conflict.txt", "original\n", "Seed conflict file");
    git(work, &["push", "origin", "main"]);

    git(work, &["checkout", "-b", "a"]);
    commit_file(work, "conflict.txt", "from-a\n", "Rewrite in a");
    git(work, &["push", "-u", "origin", "a"]);

    // Two sequential commits on b, each touching the conflicting file
    git(work, &["checkout", "-b", "b"]);
    commit_file(work, "conflict.txt", "from-b1\n", "First rewrite in b");
    commit_file(work, "conflict.txt", "from-b2\n", "Second rewrite in b");
    git(work, &["push", "-u", "origin", "b"]);

    merge_on_remote(&remote.other, "a");
    commit_file(&remote.other, "conflict.txt", "hotfix\n", "Competing hotfix");
    git(&remote.other, &["push", "origin", "main"]);

    let store = MetadataStore::new(work);
    let mut set = StackSet::new(Settings::default());
    let mut stack = Stack::new("feature".to_string(), "main".to_string());
    stack.push_branch("a".to_string()).unwrap();
    stack.push_branch("b".to_string()).unwrap();
    set.add_stack(stack).unwrap();
    store.save(&set).unwrap();

    git(work, &["config", "rerere.enabled", "true"]);
    git(work, &["fetch", "origin"]);

    // Record both resolutions in a throwaway rebase
    let b_before = common::git_out(work, &["rev-parse", "b"]);
    git(work, &["checkout", "b"]);
    let rebase = std::process::Command::new("git")
        .args(["rebase", "--onto", "origin/main", "a"])
        .current_dir(work)
        .env("GIT_EDITOR", "true")
        .output()
        .unwrap();
    assert!(!rebase.status.success(), "expected the first conflict");
    resolve_conflict(work, "resolved-1\n");
    let cont = std::process::Command::new("git")
        .args(["rebase", "--continue"])
        .current_dir(work)
        .env("GIT_EDITOR", "true")
        .output()
        .unwrap();
    assert!(!cont.status.success(), "expected the second conflict");
    resolve_conflict(work, "resolved-2\n");
    git(work, &["rebase", "--continue"]);

    git(work, &["checkout", "main"]);
    git(work, &["branch", "-f", "b", &b_before]);
    git(work, &["checkout", "b"]);

    let repo = GitRepository::open(work).unwrap();
    let mut engine = SyncEngine::new(&repo, &store).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    engine = engine.with_progress(tx);

    let outcome = engine.run(&merged_event_a()).unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed));

    drop(engine);
    let phases: Vec<SyncPhase> = rx.iter().map(|run| run.phase).collect();
    let conflict_cycles = phases
        .iter()
        .filter(|p| **p == SyncPhase::CheckingConflicts)
        .count();
    assert_eq!(conflict_cycles, 2, "one cycle per replayed conflicting commit");
    assert!(!phases.contains(&SyncPhase::AwaitingUser));

    let content = std::fs::read_to_string(work.join("conflict.txt")).unwrap();
    assert_eq!(content, "resolved-2\n");
}

#[test]
fn recorded_resolution_continues_automatically() {
    let remote = setup_remote();
    let store = setup_conflicting_stack(&remote, true);
    let work = &remote.work;

    git(work, &["config", "rerere.enabled", "true"]);
    git(work, &["fetch", "origin"]);

    // Record the resolution once: hit the same conflict in a throwaway
    // rebase, resolve it, and let rerere remember the postimage.
    let b_before = common::git_out(work, &["rev-parse", "b"]);
    git(work, &["checkout", "b"]);
    let rebase = std::process::Command::new("git")
        .args(["rebase", "--onto", "origin/main", "a"])
        .current_dir(work)
        .env("GIT_EDITOR", "true")
        .output()
        .unwrap();
    assert!(!rebase.status.success(), "expected a conflict to record");
    resolve_conflict(work, "resolved\n");
    git(work, &["rebase", "--continue"]);

    // Rewind so the engine replays the exact same conflict
    git(work, &["checkout", "main"]);
    git(work, &["branch", "-f", "b", &b_before]);
    git(work, &["checkout", "b"]);

    let repo = GitRepository::open(work).unwrap();
    let mut engine = SyncEngine::new(&repo, &store).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    engine = engine.with_progress(tx);

    let outcome = engine.run(&merged_event_a()).unwrap();
    assert!(
        matches!(outcome, SyncOutcome::Completed),
        "cache-covered conflict should continue without manual help"
    );

    drop(engine);
    let runs: Vec<_> = rx.iter().collect();
    let phases: Vec<SyncPhase> = runs.iter().map(|run| run.phase).collect();
    assert!(phases.contains(&SyncPhase::CheckingConflicts));
    assert!(!phases.contains(&SyncPhase::AwaitingUser));
    assert!(runs
        .iter()
        .any(|run| run.auto_resolved_files.contains(&"conflict.txt".to_string())));

    let content = std::fs::read_to_string(work.join("conflict.txt")).unwrap();
    assert_eq!(content, "resolved\n");

    let set = store.load().unwrap();
    assert_eq!(set.get_stack("feature").unwrap().branches, vec!["b"]);
}
