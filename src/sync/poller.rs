use crate::errors::Result;
use crate::git::{self, GitRepository, SyncStatus};
use crate::github::{GhClient, PrStatus};
use crate::stack::Stack;
use futures::future::join_all;
use tracing::debug;

/// Per-branch status, recomputed every poll and never persisted
#[derive(Debug, Clone)]
pub struct BranchInfo {
    pub name: String,
    pub pr_number: Option<u64>,
    pub pr_status: PrStatus,
    pub sync_status: SyncStatus,
}

/// Queries the review system for every tracked branch of a stack, fanning
/// the per-branch requests out concurrently.
pub struct StatusPoller<'a> {
    client: &'a GhClient,
}

impl<'a> StatusPoller<'a> {
    pub fn new(client: &'a GhClient) -> Self {
        Self { client }
    }

    /// Take one snapshot of a stack's branches
    pub async fn snapshot(&self, repo: &GitRepository, stack: &Stack) -> Result<Vec<BranchInfo>> {
        let fetched = join_all(
            stack
                .branches
                .iter()
                .map(|branch| self.client.pr_for_branch(branch)),
        )
        .await;

        let mut infos = Vec::with_capacity(stack.branches.len());
        for (branch, result) in stack.branches.iter().zip(fetched) {
            let (pr_number, pr_status) = match result? {
                Some(pr) => (Some(pr.number), pr.status),
                None => (None, PrStatus::None),
            };

            let sync_status = match git::status::classify_branch(repo, branch) {
                Ok(status) => status,
                Err(e) => {
                    debug!("Could not classify '{}': {}", branch, e);
                    SyncStatus::Unknown
                }
            };

            infos.push(BranchInfo {
                name: branch.clone(),
                pr_number,
                pr_status,
                sync_status,
            });
        }

        Ok(infos)
    }
}
