use crate::errors::{RippleError, Result};
use crate::git;
use serde::{Deserialize, Serialize};
use std::path::Path;

const STATE_FILE: &str = "RIPPLE_SYNC_STATE";

/// Phase of a sync run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    Idle,
    Fetching,
    Rebasing,
    CheckingConflicts,
    AwaitingUser,
    Success,
    Error,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Rebasing => "rebasing",
            SyncPhase::CheckingConflicts => "checking-conflicts",
            SyncPhase::AwaitingUser => "awaiting-user",
            SyncPhase::Success => "success",
            SyncPhase::Error => "error",
        };
        f.write_str(s)
    }
}

/// Immutable snapshot of a sync run, emitted on every state transition
#[derive(Debug, Clone)]
pub struct SyncRun {
    /// Current phase
    pub phase: SyncPhase,
    /// Stack being synced
    pub stack_name: String,
    /// The branch whose PR was merged
    pub merged_branch: String,
    /// Descendant branches being rebased, in stack order
    pub child_branches: Vec<String>,
    /// Branch currently being operated on
    pub current_branch: Option<String>,
    /// Files still carrying conflicts
    pub conflicted_files: Vec<String>,
    /// Files the resolution cache rewrote so far
    pub auto_resolved_files: Vec<String>,
    /// Terminal error message, if any
    pub error: Option<String>,
}

impl SyncRun {
    pub fn new(stack_name: String, merged_branch: String, child_branches: Vec<String>) -> Self {
        Self {
            phase: SyncPhase::Idle,
            stack_name,
            merged_branch,
            child_branches,
            current_branch: None,
            conflicted_files: Vec::new(),
            auto_resolved_files: Vec::new(),
            error: None,
        }
    }
}

/// Final result of a sync run that did not error
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The stack was rebased and metadata updated
    Completed,
    /// The rebase stopped on conflicts the resolution cache could not cover.
    /// The rebase is deliberately left open for manual resolution.
    AwaitingUser {
        conflicted_files: Vec<String>,
        auto_resolved_files: Vec<String>,
    },
}

/// Persisted marker for an in-progress sync.
///
/// Written before the working tree is touched and removed on any terminal
/// transition, so an interrupted or awaiting-user sync can be continued or
/// aborted from a later invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStateFile {
    /// Name of the stack being synced
    pub stack_name: String,
    /// The merged branch driving this sync
    pub merged_branch: String,
    /// PR number of the merged branch
    pub pr_number: Option<u64>,
    /// Branch the user was on before the sync started
    pub original_branch: String,
    /// Descendant branches being rebased
    pub child_branches: Vec<String>,
}

impl SyncStateFile {
    /// Save sync state under the repository's git directory
    pub fn save(&self, workdir: &Path) -> Result<()> {
        let path = git::resolve_git_dir(workdir)?.join(STATE_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RippleError::config(format!("Failed to serialize sync state: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| RippleError::config(format!("Failed to write sync state: {e}")))?;
        tracing::debug!("Saved sync state to {:?}", path);
        Ok(())
    }

    /// Load sync state from the repository's git directory
    pub fn load(workdir: &Path) -> Result<Self> {
        let path = git::resolve_git_dir(workdir)?.join(STATE_FILE);

        if !path.exists() {
            return Err(RippleError::config(
                "No in-progress sync found. Nothing to continue.",
            ));
        }

        let json = std::fs::read_to_string(&path)
            .map_err(|e| RippleError::config(format!("Failed to read sync state: {e}")))?;
        let state: Self = serde_json::from_str(&json)
            .map_err(|e| RippleError::config(format!("Failed to parse sync state: {e}")))?;
        Ok(state)
    }

    /// Delete the sync state file
    pub fn delete(workdir: &Path) -> Result<()> {
        let path = git::resolve_git_dir(workdir)?.join(STATE_FILE);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| RippleError::config(format!("Failed to delete sync state: {e}")))?;
            tracing::debug!("Deleted sync state file");
        }
        Ok(())
    }

    /// Check if a sync state file exists
    pub fn exists(workdir: &Path) -> bool {
        git::resolve_git_dir(workdir)
            .map(|dir| dir.join(STATE_FILE).exists())
            .unwrap_or(false)
    }
}
