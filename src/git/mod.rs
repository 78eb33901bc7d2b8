//! Git integration
//!
//! Read-side ref queries (current branch, upstream lookup, merge-base) go
//! through libgit2. Operations libgit2 does not model (fetch with the
//! user's credential helpers, `rebase --update-refs`, rerere) shell out to
//! the `git` binary.

pub mod rerere;
pub mod repository;
pub mod status;

pub use rerere::{RerereCache, RerereOutcome};
pub use repository::{GitRepository, RebaseStepResult};
pub use status::SyncStatus;

use crate::errors::{RippleError, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Resolve the per-worktree git directory from a workdir path.
/// Handles both normal repos (.git is a directory) and worktrees (.git is a
/// file containing `gitdir: <path>`).
pub fn resolve_git_dir(workdir: &Path) -> Result<std::path::PathBuf> {
    let git_path = workdir.join(".git");
    if git_path.is_dir() {
        Ok(git_path)
    } else if git_path.is_file() {
        let content = std::fs::read_to_string(&git_path)
            .map_err(|e| RippleError::config(format!("Failed to read .git file: {e}")))?;
        let gitdir = content
            .strip_prefix("gitdir: ")
            .map(|s| s.trim())
            .ok_or_else(|| RippleError::config("Invalid .git file format"))?;
        let resolved = if Path::new(gitdir).is_absolute() {
            std::path::PathBuf::from(gitdir)
        } else {
            workdir.join(gitdir)
        };
        Ok(resolved)
    } else {
        Err(RippleError::config(format!(
            "Not a git repository: {}",
            git_path.display()
        )))
    }
}

/// Find the root of the Git repository containing `start_path`
pub fn find_repository_root(start_path: &Path) -> Result<std::path::PathBuf> {
    let repo = git2::Repository::discover(start_path).map_err(RippleError::Git)?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| RippleError::config("Repository has no working directory (bare repo?)"))?;

    Ok(workdir.to_path_buf())
}

/// Create a git Command with terminal prompts disabled
pub(crate) fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    // Continue must never open an editor for the replayed commit message
    cmd.env("GIT_EDITOR", "true");
    cmd
}

/// Run a git command, failing on non-zero exit
pub(crate) fn run_git(workdir: &Path, args: &[&str]) -> Result<Output> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Err(RippleError::rebase(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )))
    }
}

/// Run a git command and return trimmed stdout
pub(crate) fn run_git_stdout(workdir: &Path, args: &[&str]) -> Result<String> {
    let output = run_git(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
