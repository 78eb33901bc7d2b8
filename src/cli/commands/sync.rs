use crate::cli::output::Output;
use crate::errors::{RippleError, Result};
use crate::git::GitRepository;
use crate::github::{GhClient, PrMetadataSynchronizer, PrStatus};
use crate::stack::MetadataStore;
use crate::sync::{MergedEvent, SyncEngine, SyncOutcome, SyncPhase, SyncRun, SyncStateFile};
use crate::utils::Spinner;
use dialoguer::Confirm;
use std::path::Path;
use std::sync::mpsc;

/// Run one sync for a merged branch, or continue/abort an in-progress one
pub async fn run(branch: Option<String>, continue_sync: bool, abort: bool) -> Result<()> {
    let repo = GitRepository::open_current()?;
    let repo_path = repo.path().to_path_buf();

    if abort {
        let store = MetadataStore::new(&repo_path);
        let mut engine = SyncEngine::new(&repo, &store)?;
        engine.abort()?;
        Output::success("Sync aborted; original branch restored");
        return Ok(());
    }

    if continue_sync {
        let state = SyncStateFile::load(&repo_path)?;
        let stack_name = state.stack_name.clone();
        let outcome = resume_with_progress(&repo_path)?;
        report_outcome(&repo_path, &stack_name, outcome).await;
        return Ok(());
    }

    let branch = branch.ok_or_else(|| {
        RippleError::validation("Pass a merged branch name, or use --continue / --abort")
    })?;

    let store = MetadataStore::new(&repo_path);
    let set = store.load()?;
    let stack = set.stack_for_branch(&branch).ok_or_else(|| {
        RippleError::branch(format!("Branch '{branch}' is not tracked by any stack"))
    })?;

    // Confirm against the remote that the PR really merged
    let client = GhClient::new(&repo_path);
    let pr = client
        .pr_for_branch(&branch)
        .await?
        .ok_or_else(|| RippleError::remote(format!("Branch '{branch}' has no pull request")))?;

    if pr.status != PrStatus::Merged {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "PR #{} for '{branch}' is {} (not merged). Sync anyway?",
                pr.number, pr.status
            ))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !proceed {
            Output::info("Sync cancelled");
            return Ok(());
        }
    }

    let event = MergedEvent {
        stack_name: stack.name.clone(),
        branch: branch.clone(),
        pr_number: pr.number,
        child_branches: stack.branches_after(&branch),
    };
    let stack_name = stack.name.clone();

    let outcome = run_engine_with_progress(&repo_path, &event)?;
    report_outcome(&repo_path, &stack_name, outcome).await;
    Ok(())
}

/// Run the engine on a worker thread, rendering progress snapshots from its
/// channel as they arrive.
pub(crate) fn run_engine_with_progress(
    repo_path: &Path,
    event: &MergedEvent,
) -> Result<SyncOutcome> {
    let spinner = Spinner::new(format!("Syncing after merge of '{}'...", event.branch));
    let (tx, rx) = mpsc::channel();

    let path = repo_path.to_path_buf();
    let event = event.clone();
    let worker = std::thread::spawn(move || -> Result<SyncOutcome> {
        let repo = GitRepository::open(&path)?;
        let store = MetadataStore::new(&path);
        let mut engine = SyncEngine::new(&repo, &store)?.with_progress(tx);
        engine.run(&event)
    });

    for run in rx {
        spinner.update_message(describe_run(&run));
    }

    let outcome = worker
        .join()
        .map_err(|_| RippleError::invalid_operation("Sync worker panicked"))?;
    spinner.stop();
    outcome
}

fn resume_with_progress(repo_path: &Path) -> Result<SyncOutcome> {
    let spinner = Spinner::new("Continuing sync...".to_string());
    let (tx, rx) = mpsc::channel();

    let path = repo_path.to_path_buf();
    let worker = std::thread::spawn(move || -> Result<SyncOutcome> {
        let repo = GitRepository::open(&path)?;
        let store = MetadataStore::new(&path);
        let mut engine = SyncEngine::new(&repo, &store)?.with_progress(tx);
        engine.resume()
    });

    for run in rx {
        spinner.update_message(describe_run(&run));
    }

    let outcome = worker
        .join()
        .map_err(|_| RippleError::invalid_operation("Sync worker panicked"))?;
    spinner.stop();
    outcome
}

fn describe_run(run: &SyncRun) -> String {
    match run.phase {
        SyncPhase::Idle => "Preparing...".to_string(),
        SyncPhase::Fetching => format!("Fetching latest base for '{}'...", run.stack_name),
        SyncPhase::Rebasing => match &run.current_branch {
            Some(branch) => format!("Rebasing '{branch}' and descendants..."),
            None => "Rebasing...".to_string(),
        },
        SyncPhase::CheckingConflicts => format!(
            "Consulting resolution cache for {} conflicted file(s)...",
            run.conflicted_files.len()
        ),
        SyncPhase::AwaitingUser => "Conflicts need manual resolution".to_string(),
        SyncPhase::Success => "Finishing up...".to_string(),
        SyncPhase::Error => "Sync failed".to_string(),
    }
}

/// Print the outcome and, on success, bring PR metadata back in line
pub(crate) async fn report_outcome(repo_path: &Path, stack_name: &str, outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Completed => {
            Output::success("Stack synchronized");
            Output::tip("Rewritten branches need a push: git push --force-with-lease");
            sync_pr_metadata(repo_path, stack_name).await;
        }
        SyncOutcome::AwaitingUser {
            conflicted_files,
            auto_resolved_files,
        } => {
            Output::warning("Rebase stopped on conflicts the resolution cache could not cover");
            if !auto_resolved_files.is_empty() {
                Output::info(format!(
                    "Auto-resolved: {}",
                    auto_resolved_files.join(", ")
                ));
            }
            for file in &conflicted_files {
                Output::bullet(file);
            }
            Output::next_steps(&[
                "Resolve the conflicts and stage the files (git add)",
                "Continue with: rp sync --continue",
                "Or abandon with: rp sync --abort",
            ]);
        }
    }
}

/// Best-effort PR metadata pass; failures are reported, never fatal
async fn sync_pr_metadata(repo_path: &Path, stack_name: &str) {
    let store = MetadataStore::new(repo_path);
    let set = match store.load() {
        Ok(set) => set,
        Err(e) => {
            Output::warning(format!("Could not reload stacks: {e}"));
            return;
        }
    };
    let Some(stack) = set.get_stack(stack_name) else {
        return;
    };
    if stack.is_empty() {
        Output::info(format!("Stack '{stack_name}' is now empty"));
        return;
    }

    let client = GhClient::new(repo_path);
    let synchronizer = PrMetadataSynchronizer::new(&client);
    for report in synchronizer.sync_stack(stack).await {
        if let Some(number) = report.pr_number {
            if report.success && report.failures.is_empty() {
                if report.retargeted || report.relabeled || report.body_updated {
                    Output::sub_item(format!("Updated PR #{number} ({})", report.branch));
                }
            } else {
                Output::warning(format!(
                    "PR #{number} ({}): {}",
                    report.branch,
                    report.failures.join("; ")
                ));
            }
        }
    }
}
