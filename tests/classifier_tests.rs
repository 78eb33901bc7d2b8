//! Branch classifier tests against real repositories.

mod common;

use common::{commit_file, git, setup_remote, stacked_branch};
use ripple_cli::git::status::classify_branch;
use ripple_cli::git::{GitRepository, SyncStatus};

#[test]
fn no_upstream_is_needs_push() {
    let remote = setup_remote();
    git(&remote.work, &["checkout", "-b", "feature-local"]);
    commit_file(&remote.work, "f.txt", "x\n", "Local work");

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-local").unwrap(),
        SyncStatus::NeedsPush
    );
}

#[test]
fn pushed_branch_is_up_to_date() {
    let remote = setup_remote();
    stacked_branch(&remote.work, "feature-a", "a.txt", "a\n");

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-a").unwrap(),
        SyncStatus::UpToDate
    );
}

#[test]
fn local_ahead_is_needs_push() {
    let remote = setup_remote();
    stacked_branch(&remote.work, "feature-a", "a.txt", "a\n");
    commit_file(&remote.work, "a2.txt", "more\n", "More work");

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-a").unwrap(),
        SyncStatus::NeedsPush
    );
}

#[test]
fn remote_ahead_is_needs_rebase() {
    let remote = setup_remote();
    stacked_branch(&remote.work, "feature-a", "a.txt", "a\n");

    // Someone else advances the branch
    git(&remote.other, &["fetch", "origin"]);
    git(&remote.other, &["checkout", "feature-a"]);
    commit_file(&remote.other, "their.txt", "theirs\n", "Their work");
    git(&remote.other, &["push", "origin", "feature-a"]);

    // Leave the branch so the dirty check cannot interfere
    git(&remote.work, &["checkout", "main"]);
    git(&remote.work, &["fetch", "origin"]);

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-a").unwrap(),
        SyncStatus::NeedsRebase
    );
}

#[test]
fn diverged_histories_are_conflicts() {
    let remote = setup_remote();
    stacked_branch(&remote.work, "feature-a", "a.txt", "a\n");

    git(&remote.other, &["fetch", "origin"]);
    git(&remote.other, &["checkout", "feature-a"]);
    commit_file(&remote.other, "their.txt", "theirs\n", "Their work");
    git(&remote.other, &["push", "origin", "feature-a"]);

    commit_file(&remote.work, "mine.txt", "mine\n", "My work");
    git(&remote.work, &["checkout", "main"]);
    git(&remote.work, &["fetch", "origin"]);

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-a").unwrap(),
        SyncStatus::Conflicts
    );
}

#[test]
fn dirty_checkout_outranks_remote_divergence() {
    let remote = setup_remote();
    stacked_branch(&remote.work, "feature-a", "a.txt", "a\n");

    // Remote moves ahead while we sit on the branch with local edits
    git(&remote.other, &["fetch", "origin"]);
    git(&remote.other, &["checkout", "feature-a"]);
    commit_file(&remote.other, "their.txt", "theirs\n", "Their work");
    git(&remote.other, &["push", "origin", "feature-a"]);

    git(&remote.work, &["fetch", "origin"]);
    std::fs::write(remote.work.join("a.txt"), "uncommitted edit\n").unwrap();

    let repo = GitRepository::open(&remote.work).unwrap();
    assert_eq!(
        classify_branch(&repo, "feature-a").unwrap(),
        SyncStatus::NeedsPush
    );
}
