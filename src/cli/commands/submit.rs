use crate::cli::output::Output;
use crate::errors::{RippleError, Result};
use crate::git::GitRepository;
use crate::github::{metadata, GhClient};
use crate::stack::MetadataStore;
use std::collections::HashMap;

/// Create a pull request for a tracked branch, based on its stack parent
pub async fn run(branch: Option<String>, draft: bool, web: bool) -> Result<()> {
    let repo = GitRepository::open_current()?;
    let store = MetadataStore::new(repo.path());
    let set = store.load()?;

    let branch = match branch {
        Some(branch) => branch,
        None => repo.current_branch()?,
    };

    let stack = set.stack_for_branch(&branch).ok_or_else(|| {
        RippleError::branch(format!("Branch '{branch}' is not tracked by any stack"))
    })?;
    let base = stack.parent_of(&branch).ok_or_else(|| {
        RippleError::branch(format!("Could not determine parent of '{branch}'"))
    })?;

    let client = GhClient::new(repo.path());
    if let Some(existing) = client.pr_for_branch(&branch).await? {
        Output::info(format!(
            "Branch '{branch}' already has PR #{}",
            existing.number
        ));
        if web {
            client.open_in_browser(&branch).await?;
        }
        return Ok(());
    }

    let title = repo.branch_tip_summary(&branch)?;
    let label = stack.position_label(&branch);
    let body = metadata::render_stack_block(stack, &branch, &HashMap::new());

    client
        .create_pr(&branch, base, &title, &body, label.as_deref(), draft)
        .await?;

    Output::success(format!("Created PR for '{branch}' (base: {base})"));
    if web {
        client.open_in_browser(&branch).await?;
    }
    Ok(())
}
