use crate::errors::Result;
use crate::git::GitRepository;
use serde::{Deserialize, Serialize};

/// Synchronization status of a tracked branch relative to its upstream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Local and upstream tips match
    UpToDate,
    /// Local work (or no upstream yet) that the remote has not seen
    NeedsPush,
    /// Upstream moved ahead of the local tip
    NeedsRebase,
    /// Local and upstream histories diverged
    Conflicts,
    /// A queued sync will rewrite this branch
    PendingSync,
    /// Status could not be determined
    Unknown,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::UpToDate => "up-to-date",
            SyncStatus::NeedsPush => "needs-push",
            SyncStatus::NeedsRebase => "needs-rebase",
            SyncStatus::Conflicts => "conflicts",
            SyncStatus::PendingSync => "pending-sync",
            SyncStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a branch by comparing its local and upstream tips.
///
/// The check order is a deliberate priority: uncommitted local work outranks
/// remote divergence, since pushing is the prerequisite for any meaningful
/// rebase.
pub fn classify_branch(repo: &GitRepository, branch: &str) -> Result<SyncStatus> {
    let upstream = match repo.upstream_of(branch)? {
        Some(upstream) => upstream,
        None => return Ok(SyncStatus::NeedsPush),
    };

    if repo.current_branch()? == branch && repo.is_dirty()? {
        return Ok(SyncStatus::NeedsPush);
    }

    let local = repo.branch_head(branch)?;
    let remote = repo.remote_ref_head(&upstream)?;

    if local == remote {
        return Ok(SyncStatus::UpToDate);
    }

    let ancestor = repo.merge_base(&local, &remote)?;
    if ancestor == remote {
        Ok(SyncStatus::NeedsPush)
    } else if ancestor == local {
        Ok(SyncStatus::NeedsRebase)
    } else {
        Ok(SyncStatus::Conflicts)
    }
}
