use crate::errors::{RippleError, Result};
use crate::git::{git_command, run_git, run_git_stdout};
use git2::Repository;
use std::path::{Path, PathBuf};

/// Outcome of a single rebase or rebase-continue invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStepResult {
    /// The rebase ran to completion
    Completed,
    /// The rebase stopped on a conflicted commit
    Conflicted {
        /// Unmerged paths reported by the index
        files: Vec<String>,
    },
}

impl RebaseStepResult {
    /// Returns true if the step finished the rebase
    pub fn is_completed(&self) -> bool {
        matches!(self, RebaseStepResult::Completed)
    }
}

/// Wrapper around a git repository.
///
/// Ref queries go through libgit2; fetch, rebase and rerere shell out to the
/// `git` binary, which owns those behaviors (credential helpers,
/// `--update-refs`, the resolution cache).
pub struct GitRepository {
    repo: Repository,
    path: PathBuf,
}

impl GitRepository {
    /// Open a Git repository at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| RippleError::config(format!("Not a git repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| RippleError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            repo,
            path: workdir,
        })
    }

    /// Open the repository containing the current working directory
    pub fn open_current() -> Result<Self> {
        let current_dir = std::env::current_dir()
            .map_err(|e| RippleError::config(format!("Could not get current directory: {e}")))?;
        Self::open(&current_dir)
    }

    /// Get repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| RippleError::branch(format!("Could not get HEAD: {e}")))?;

        if let Some(name) = head.shorthand() {
            Ok(name.to_string())
        } else {
            let commit = head
                .peel_to_commit()
                .map_err(|e| RippleError::branch(format!("Could not get HEAD commit: {e}")))?;
            Ok(format!("HEAD@{}", commit.id()))
        }
    }

    /// Check if the working directory has uncommitted changes
    pub fn is_dirty(&self) -> Result<bool> {
        let statuses = self.repo.statuses(None).map_err(RippleError::Git)?;

        for status in statuses.iter() {
            let flags = status.status();
            if flags.intersects(
                git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_NEW
                    | git2::Status::INDEX_DELETED
                    | git2::Status::WT_MODIFIED
                    | git2::Status::WT_NEW
                    | git2::Status::WT_DELETED,
            ) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Check if a local branch exists
    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, git2::BranchType::Local).is_ok()
    }

    /// Get the commit hash at the head of a local branch
    pub fn branch_head(&self, branch_name: &str) -> Result<String> {
        let branch = self
            .repo
            .find_branch(branch_name, git2::BranchType::Local)
            .map_err(|e| {
                RippleError::branch(format!("Could not find branch '{branch_name}': {e}"))
            })?;

        let commit = branch.get().peel_to_commit().map_err(|e| {
            RippleError::branch(format!(
                "Could not get commit for branch '{branch_name}': {e}"
            ))
        })?;

        Ok(commit.id().to_string())
    }

    /// Subject line of the commit at a branch's tip
    pub fn branch_tip_summary(&self, branch_name: &str) -> Result<String> {
        let branch = self
            .repo
            .find_branch(branch_name, git2::BranchType::Local)
            .map_err(|e| {
                RippleError::branch(format!("Could not find branch '{branch_name}': {e}"))
            })?;
        let commit = branch.get().peel_to_commit().map_err(RippleError::Git)?;
        Ok(commit.summary().unwrap_or("").to_string())
    }

    /// Get the shorthand name of the upstream tracking ref for a branch,
    /// e.g. "origin/feature-auth". `None` when no upstream is configured or
    /// the remote ref does not exist locally.
    pub fn upstream_of(&self, branch_name: &str) -> Result<Option<String>> {
        let branch = match self.repo.find_branch(branch_name, git2::BranchType::Local) {
            Ok(branch) => branch,
            Err(_) => return Ok(None),
        };

        match branch.upstream() {
            Ok(upstream) => {
                let name = upstream
                    .name()
                    .map_err(RippleError::Git)?
                    .map(|s| s.to_string());
                Ok(name)
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(RippleError::Git(e)),
        }
    }

    /// Get the commit hash a remote tracking ref points at
    pub fn remote_ref_head(&self, shorthand: &str) -> Result<String> {
        let branch = self
            .repo
            .find_branch(shorthand, git2::BranchType::Remote)
            .map_err(|e| {
                RippleError::branch(format!("Could not find remote ref '{shorthand}': {e}"))
            })?;

        let commit = branch.get().peel_to_commit().map_err(|e| {
            RippleError::branch(format!("Could not get commit for '{shorthand}': {e}"))
        })?;

        Ok(commit.id().to_string())
    }

    /// Compute the common ancestor of two commits
    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let oid_a = git2::Oid::from_str(a).map_err(RippleError::Git)?;
        let oid_b = git2::Oid::from_str(b).map_err(RippleError::Git)?;
        let base = self.repo.merge_base(oid_a, oid_b).map_err(RippleError::Git)?;
        Ok(base.to_string())
    }

    /// Switch to a branch
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| RippleError::branch(format!("Could not find branch '{name}': {e}")))?;

        let branch_ref = branch.get();
        let tree = branch_ref.peel_to_tree().map_err(|e| {
            RippleError::branch(format!("Could not get tree for branch '{name}': {e}"))
        })?;

        self.repo
            .checkout_tree(tree.as_object(), None)
            .map_err(|e| {
                RippleError::branch(format!("Could not checkout branch '{name}': {e}"))
            })?;

        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .map_err(|e| {
                RippleError::branch(format!("Could not update HEAD to '{name}': {e}"))
            })?;

        tracing::debug!("Switched to branch '{}'", name);
        Ok(())
    }

    /// Delete a local branch
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| RippleError::branch(format!("Could not find branch '{name}': {e}")))?;

        branch
            .delete()
            .map_err(|e| RippleError::branch(format!("Could not delete branch '{name}': {e}")))?;

        tracing::debug!("Deleted branch '{}'", name);
        Ok(())
    }

    /// Fetch a branch from a remote
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        let output = git_command(&self.path)
            .args(["fetch", remote, branch])
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RippleError::network(format!(
                "Failed to fetch {branch} from {remote}: {}",
                stderr.trim()
            )))
        }
    }

    /// Rebase the current branch onto `new_base`, replaying only commits
    /// after `upstream`, moving every branch pointer that references a
    /// rewritten commit (`--update-refs`).
    pub fn rebase_onto(
        &self,
        new_base: &str,
        upstream: &str,
        rerere_enabled: bool,
    ) -> Result<RebaseStepResult> {
        let rerere = format!("rerere.enabled={rerere_enabled}");
        let output = git_command(&self.path)
            .args([
                "-c",
                &rerere,
                "-c",
                "rerere.autoupdate=false",
                "rebase",
                "--update-refs",
                "--onto",
                new_base,
                upstream,
            ])
            .output()?;

        self.classify_rebase_output(output, "rebase")
    }

    /// Continue an in-progress rebase after conflicts were staged
    pub fn continue_rebase(&self, rerere_enabled: bool) -> Result<RebaseStepResult> {
        let rerere = format!("rerere.enabled={rerere_enabled}");
        let output = git_command(&self.path)
            .args([
                "-c",
                &rerere,
                "-c",
                "rerere.autoupdate=false",
                "rebase",
                "--continue",
            ])
            .output()?;

        self.classify_rebase_output(output, "rebase --continue")
    }

    /// Abort an in-progress rebase
    pub fn abort_rebase(&self) -> Result<()> {
        run_git(&self.path, &["rebase", "--abort"])?;
        Ok(())
    }

    /// Check whether a rebase is currently in progress
    pub fn rebase_in_progress(&self) -> bool {
        let git_dir = match crate::git::resolve_git_dir(&self.path) {
            Ok(dir) => dir,
            Err(_) => return false,
        };
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Unmerged paths in the index
    pub fn conflicted_files(&self) -> Result<Vec<String>> {
        let stdout = run_git_stdout(&self.path, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// Stage the given paths
    pub fn stage_files(&self, files: &[String]) -> Result<()> {
        let mut args: Vec<&str> = vec!["add", "--"];
        args.extend(files.iter().map(|f| f.as_str()));
        run_git(&self.path, &args)?;
        Ok(())
    }

    fn classify_rebase_output(
        &self,
        output: std::process::Output,
        what: &str,
    ) -> Result<RebaseStepResult> {
        if output.status.success() {
            return Ok(RebaseStepResult::Completed);
        }

        if self.rebase_in_progress() {
            let files = self.conflicted_files()?;
            if !files.is_empty() {
                return Ok(RebaseStepResult::Conflicted { files });
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(RippleError::rebase(format!(
            "git {what} failed without reporting conflicts: {}",
            stderr.trim()
        )))
    }
}
