use crate::cli::output::Output;
use crate::errors::Result;
use crate::git::{self, GitRepository, SyncStatus};
use crate::github::{GhClient, PrStatus};
use crate::stack::MetadataStore;
use crate::sync::{BranchInfo, StatusPoller};
use console::style;

/// Show every tracked branch with its sync and PR status
pub async fn run() -> Result<()> {
    let repo = GitRepository::open_current()?;
    let store = MetadataStore::new(repo.path());
    let set = store.load()?;

    if set.stacks.is_empty() {
        Output::info("No stacks. Create one with 'rp stack create <name>'.");
        return Ok(());
    }

    let client = GhClient::new(repo.path());
    let poller = StatusPoller::new(&client);

    for stack in &set.stacks {
        Output::section(format!("{} (on {})", stack.name, stack.base_branch));

        let infos = match poller.snapshot(&repo, stack).await {
            Ok(infos) => infos,
            Err(e) => {
                Output::warning(format!("Remote status unavailable: {e}"));
                classifier_only(&repo, stack)
            }
        };

        for info in &infos {
            println!(
                "  {:<30} {:<14} {}",
                info.name,
                colored_sync_status(info.sync_status),
                pr_summary(info)
            );
        }
    }

    Ok(())
}

fn classifier_only(repo: &GitRepository, stack: &crate::stack::Stack) -> Vec<BranchInfo> {
    stack
        .branches
        .iter()
        .map(|branch| BranchInfo {
            name: branch.clone(),
            pr_number: None,
            pr_status: PrStatus::None,
            sync_status: git::status::classify_branch(repo, branch)
                .unwrap_or(SyncStatus::Unknown),
        })
        .collect()
}

fn colored_sync_status(status: SyncStatus) -> String {
    let text = status.as_str();
    match status {
        SyncStatus::UpToDate => style(text).green().to_string(),
        SyncStatus::NeedsPush | SyncStatus::NeedsRebase => style(text).yellow().to_string(),
        SyncStatus::Conflicts => style(text).red().to_string(),
        SyncStatus::PendingSync => style(text).cyan().to_string(),
        SyncStatus::Unknown => style(text).dim().to_string(),
    }
}

fn pr_summary(info: &BranchInfo) -> String {
    match info.pr_number {
        Some(number) => format!("#{number} {}", info.pr_status),
        None => style("no PR").dim().to_string(),
    }
}
