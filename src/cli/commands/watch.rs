use crate::cli::commands::sync::{report_outcome, run_engine_with_progress};
use crate::cli::output::Output;
use crate::errors::Result;
use crate::git::{GitRepository, SyncStatus};
use crate::github::GhClient;
use crate::stack::MetadataStore;
use crate::sync::{MergeDetector, StatusPoller};
use dialoguer::Confirm;
use std::time::Duration;
use tracing::warn;

/// Poll the review system on a timer, detect merges, and drive syncs after
/// operator confirmation. One sync at a time; polling resumes afterwards.
pub async fn run(once: bool) -> Result<()> {
    let repo = GitRepository::open_current()?;
    let repo_path = repo.path().to_path_buf();
    let store = MetadataStore::new(&repo_path);

    let interval_ms = store.load()?.settings.effective_poll_interval_ms();
    let client = GhClient::new(&repo_path);
    let poller = StatusPoller::new(&client);
    let mut detector = MergeDetector::new();

    Output::info(format!(
        "Watching tracked stacks (every {}s). Ctrl-C to stop.",
        interval_ms / 1000
    ));

    loop {
        // Reload each cycle so stack edits from other commands are seen
        let set = match store.load() {
            Ok(set) => set,
            Err(e) => {
                Output::error(format!("{e}"));
                return Err(e);
            }
        };

        let pending = detector.pending_branches();
        for stack in &set.stacks {
            let mut snapshot = match poller.snapshot(&repo, stack).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Poll failed for stack '{}': {}", stack.name, e);
                    continue;
                }
            };
            for info in &mut snapshot {
                if pending.contains(&info.name) {
                    info.sync_status = SyncStatus::PendingSync;
                }
            }
            detector.observe(stack, &snapshot);
        }

        // Surface at most one event per cycle; the rest keep waiting
        if let Some(event) = detector.next_event() {
            Output::section(format!(
                "'{}' (#{}) was merged into '{}'",
                event.branch,
                event.pr_number,
                set.get_stack(&event.stack_name)
                    .map(|s| s.base_branch.as_str())
                    .unwrap_or("?")
            ));

            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Rebase {} descendant branch(es) and update the stack?",
                    event.child_branches.len()
                ))
                .default(true)
                .interact()
                .unwrap_or(false);

            if confirmed {
                for branch in &event.child_branches {
                    detector.forget(branch);
                }
                detector.forget(&event.branch);
                match run_engine_with_progress(&repo_path, &event) {
                    Ok(outcome) => {
                        report_outcome(&repo_path, &event.stack_name, outcome).await;
                    }
                    Err(e) => Output::error(format!("Sync failed: {e}")),
                }
            } else {
                Output::info(format!("Skipped sync for '{}'", event.branch));
            }
        }

        if once {
            return Ok(());
        }

        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }
}
