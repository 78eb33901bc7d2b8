//! Helpers for integration tests that script real git repositories.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run a git command in `repo`, panicking on failure
pub fn git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_EDITOR", "true")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run git {args:?}: {e}"));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run a git command and return trimmed stdout
pub fn git_out(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run git {args:?}: {e}"));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Write a file and commit it
pub fn commit_file(repo: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(repo.join(name), content).unwrap();
    git(repo, &["add", name]);
    git(repo, &["commit", "-m", message]);
}

/// Configure committer identity for a clone
pub fn configure_user(repo: &Path) {
    git(repo, &["config", "user.name", "Test User"]);
    git(repo, &["config", "user.email", "test@example.com"]);
}

/// A bare origin plus two working clones ("work" drives the tool, "other"
/// plays the remote side that merges PRs).
pub struct TestRemote {
    pub dir: TempDir,
    pub origin: PathBuf,
    pub work: PathBuf,
    pub other: PathBuf,
}

/// Create a bare origin with an initial commit on main and two clones of it
pub fn setup_remote() -> TestRemote {
    let dir = TempDir::new().unwrap();
    let origin = dir.path().join("origin.git");
    let work = dir.path().join("work");
    let other = dir.path().join("other");

    git(dir.path(), &["init", "--bare", "-b", "main", "origin.git"]);

    let seed = dir.path().join("seed");
    git(dir.path(), &["init", "-b", "main", "seed"]);
    configure_user(&seed);
    commit_file(&seed, "base.txt", "base\n", "Initial commit");
    git(
        &seed,
        &["push", origin.to_str().unwrap(), "main:main"],
    );

    git(
        dir.path(),
        &["clone", origin.to_str().unwrap(), work.to_str().unwrap()],
    );
    configure_user(&work);

    git(
        dir.path(),
        &["clone", origin.to_str().unwrap(), other.to_str().unwrap()],
    );
    configure_user(&other);

    TestRemote {
        dir,
        origin,
        work,
        other,
    }
}

/// Create a branch from the current HEAD, commit one file on it, and push
/// it with an upstream
pub fn stacked_branch(repo: &Path, name: &str, file: &str, content: &str) {
    git(repo, &["checkout", "-b", name]);
    commit_file(repo, file, content, &format!("Add {file}"));
    git(repo, &["push", "-u", "origin", name]);
}

/// Merge a branch into main on the "other" clone and push, simulating the
/// review platform merging a PR
pub fn merge_on_remote(other: &Path, branch: &str) {
    git(other, &["fetch", "origin"]);
    git(other, &["checkout", "main"]);
    git(other, &["pull", "origin", "main"]);
    git(
        other,
        &["merge", "--no-ff", &format!("origin/{branch}"), "-m", &format!("Merge {branch}")],
    );
    git(other, &["push", "origin", "main"]);
}
