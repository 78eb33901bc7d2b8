use crate::errors::{RippleError, Result};
use crate::git::status::classify_branch;
use crate::git::{GitRepository, RebaseStepResult, RerereCache};
use crate::stack::MetadataStore;
use crate::sync::detector::MergedEvent;
use crate::sync::state::{SyncOutcome, SyncPhase, SyncRun, SyncStateFile};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// Drives one sync: fetch, rebase descendants with ref propagation, run the
/// conflict-resolution loop, update metadata and clean up.
///
/// The working tree is a single-owner resource: a second sync is rejected
/// while one is outstanding, whether in this process (guard flag) or left
/// open in an awaiting-user state (persisted marker).
pub struct SyncEngine<'a> {
    repo: &'a GitRepository,
    store: &'a MetadataStore,
    remote: String,
    rerere: RerereCache,
    auto_apply: bool,
    progress: Option<Sender<SyncRun>>,
    in_progress: bool,
}

impl<'a> SyncEngine<'a> {
    /// Create a new engine over the given repository and store
    pub fn new(repo: &'a GitRepository, store: &'a MetadataStore) -> Result<Self> {
        let settings = store.load()?.settings;
        Ok(Self {
            repo,
            store,
            remote: "origin".to_string(),
            rerere: RerereCache::new(settings.rerere.enabled),
            auto_apply: settings.rerere.auto_apply,
            progress: None,
            in_progress: false,
        })
    }

    /// Attach a channel that receives a `SyncRun` snapshot per transition
    pub fn with_progress(mut self, sender: Sender<SyncRun>) -> Self {
        self.progress = Some(sender);
        self
    }

    fn emit(&self, run: &mut SyncRun, phase: SyncPhase) {
        run.phase = phase;
        debug!("sync {}: {}", run.merged_branch, phase);
        if let Some(sender) = &self.progress {
            let _ = sender.send(run.clone());
        }
    }

    fn guard(&self) -> Result<()> {
        if self.in_progress {
            return Err(RippleError::invalid_operation(
                "A sync is already running in this process",
            ));
        }
        if SyncStateFile::exists(self.repo.path()) {
            return Err(RippleError::invalid_operation(
                "A sync is already in progress. Resolve it with 'rp sync --continue' or 'rp sync --abort'.",
            ));
        }
        if self.repo.rebase_in_progress() {
            return Err(RippleError::invalid_operation(
                "A rebase is already in progress in this repository",
            ));
        }
        Ok(())
    }

    /// Run a full sync for a merged branch
    pub fn run(&mut self, event: &MergedEvent) -> Result<SyncOutcome> {
        self.guard()?;
        self.in_progress = true;
        let result = self.run_inner(event);
        self.in_progress = false;
        result
    }

    fn run_inner(&mut self, event: &MergedEvent) -> Result<SyncOutcome> {
        let set = self.store.load()?;
        let stack = set.get_stack(&event.stack_name).ok_or_else(|| {
            RippleError::validation(format!("No stack named '{}'", event.stack_name))
        })?;
        if !stack.contains(&event.branch) {
            return Err(RippleError::validation(format!(
                "Branch '{}' is not tracked by stack '{}'",
                event.branch, event.stack_name
            )));
        }

        let base_branch = stack.base_branch.clone();
        let original_branch = self.repo.current_branch()?;

        let mut run = SyncRun::new(
            event.stack_name.clone(),
            event.branch.clone(),
            event.child_branches.clone(),
        );

        self.emit(&mut run, SyncPhase::Fetching);
        if let Err(e) = self.repo.fetch(&self.remote, &base_branch) {
            run.error = Some(e.to_string());
            self.emit(&mut run, SyncPhase::Error);
            return Err(e);
        }

        // Tip merged: nothing to rebase, go straight to the metadata step
        if event.child_branches.is_empty() {
            self.finish(&mut run, &original_branch)?;
            return Ok(SyncOutcome::Completed);
        }

        let state = SyncStateFile {
            stack_name: event.stack_name.clone(),
            merged_branch: event.branch.clone(),
            pr_number: Some(event.pr_number),
            original_branch: original_branch.clone(),
            child_branches: event.child_branches.clone(),
        };
        state.save(self.repo.path())?;

        let tip = event.child_branches.last().cloned().unwrap_or_default();
        if let Err(e) = self.repo.checkout_branch(&tip) {
            let _ = SyncStateFile::delete(self.repo.path());
            run.error = Some(e.to_string());
            self.emit(&mut run, SyncPhase::Error);
            return Err(e);
        }
        run.current_branch = Some(tip);

        self.emit(&mut run, SyncPhase::Rebasing);
        let new_base = format!("{}/{}", self.remote, base_branch);
        let first = self
            .repo
            .rebase_onto(&new_base, &run.merged_branch, self.rerere.enabled());

        self.drive(run, first, &original_branch)
    }

    /// Continue a sync whose conflicts were resolved externally. The engine
    /// never auto-retries out of awaiting-user; this is an explicit
    /// re-invocation.
    pub fn resume(&mut self) -> Result<SyncOutcome> {
        let state = SyncStateFile::load(self.repo.path())?;

        let mut run = SyncRun::new(
            state.stack_name.clone(),
            state.merged_branch.clone(),
            state.child_branches.clone(),
        );
        run.current_branch = self.repo.current_branch().ok();

        if !self.repo.rebase_in_progress() {
            // The user finished (or aborted) the rebase out from under us;
            // nothing left to continue except the bookkeeping.
            self.finish(&mut run, &state.original_branch)?;
            return Ok(SyncOutcome::Completed);
        }

        let unmerged = self.repo.conflicted_files()?;
        if !unmerged.is_empty() {
            let outcome = self.rerere.partition(self.repo.path(), &unmerged)?;
            if !outcome.unresolved.is_empty() {
                return Err(RippleError::conflict(format!(
                    "Unresolved conflicts remain in: {}",
                    outcome.unresolved.join(", ")
                )));
            }
            self.repo.stage_files(&outcome.auto_resolved)?;
            run.auto_resolved_files.extend(outcome.auto_resolved);
        }

        self.emit(&mut run, SyncPhase::Rebasing);
        let step = self.repo.continue_rebase(self.rerere.enabled());
        let original_branch = state.original_branch.clone();
        self.drive(run, step, &original_branch)
    }

    /// Abort from the awaiting-user state: undo the rebase and restore the
    /// branch that was checked out when the run began. Metadata is left
    /// untouched; removal only ever happens on the success path.
    pub fn abort(&mut self) -> Result<()> {
        let state = SyncStateFile::load(self.repo.path())?;

        if self.repo.rebase_in_progress() {
            self.repo.abort_rebase()?;
        }
        self.repo.checkout_branch(&state.original_branch)?;
        SyncStateFile::delete(self.repo.path())?;

        info!(
            "Aborted sync of '{}'; back on '{}'",
            state.merged_branch, state.original_branch
        );
        Ok(())
    }

    /// The conflict-resolution loop. Each continue may conflict again on the
    /// next replayed commit; the loop is bounded by the number of commits
    /// being replayed. A continue that fails without reporting any unmerged
    /// file is a terminal error, never a retry.
    fn drive(
        &mut self,
        mut run: SyncRun,
        mut step: Result<RebaseStepResult>,
        original_branch: &str,
    ) -> Result<SyncOutcome> {
        loop {
            match step {
                Ok(RebaseStepResult::Completed) => {
                    self.finish(&mut run, original_branch)?;
                    return Ok(SyncOutcome::Completed);
                }
                Ok(RebaseStepResult::Conflicted { files }) => {
                    run.conflicted_files = files.clone();
                    self.emit(&mut run, SyncPhase::CheckingConflicts);

                    let outcome = self.rerere.partition(self.repo.path(), &files)?;

                    if outcome.unresolved.is_empty() && self.auto_apply {
                        info!(
                            "Resolution cache covered {} file(s); continuing rebase",
                            outcome.auto_resolved.len()
                        );
                        self.repo.stage_files(&outcome.auto_resolved)?;
                        run.auto_resolved_files.extend(outcome.auto_resolved);
                        run.conflicted_files.clear();
                        self.emit(&mut run, SyncPhase::Rebasing);
                        step = self.repo.continue_rebase(self.rerere.enabled());
                    } else {
                        run.auto_resolved_files.extend(outcome.auto_resolved);
                        run.conflicted_files = outcome.unresolved;
                        self.emit(&mut run, SyncPhase::AwaitingUser);
                        return Ok(SyncOutcome::AwaitingUser {
                            conflicted_files: run.conflicted_files.clone(),
                            auto_resolved_files: run.auto_resolved_files.clone(),
                        });
                    }
                }
                Err(e) => {
                    // Non-conflict failure: compensate, then report
                    if self.repo.rebase_in_progress() {
                        if let Err(abort_err) = self.repo.abort_rebase() {
                            warn!("Failed to abort rebase: {}", abort_err);
                        }
                    }
                    if let Err(restore_err) = self.repo.checkout_branch(original_branch) {
                        warn!(
                            "Failed to restore branch '{}': {}",
                            original_branch, restore_err
                        );
                    }
                    let _ = SyncStateFile::delete(self.repo.path());
                    run.error = Some(e.to_string());
                    self.emit(&mut run, SyncPhase::Error);
                    return Err(e);
                }
            }
        }
    }

    /// Success-path bookkeeping: drop the merged branch from metadata,
    /// restore the original checkout, best-effort delete the merged local
    /// branch.
    fn finish(&mut self, run: &mut SyncRun, original_branch: &str) -> Result<()> {
        let mut set = self.store.load()?;
        let nearest_descendant = run.child_branches.first().cloned();
        {
            let stack = set.get_stack_mut(&run.stack_name).ok_or_else(|| {
                RippleError::validation(format!("No stack named '{}'", run.stack_name))
            })?;
            stack.remove_branch(&run.merged_branch)?;
        }
        self.store.save(&set)?;

        let restore_to = if original_branch == run.merged_branch {
            // The merged branch is going away; land on its nearest surviving
            // descendant, or the base branch when the tip was merged.
            nearest_descendant.unwrap_or_else(|| {
                set.get_stack(&run.stack_name)
                    .map(|s| s.base_branch.clone())
                    .unwrap_or_else(|| "main".to_string())
            })
        } else {
            original_branch.to_string()
        };
        if self.repo.current_branch().ok().as_deref() != Some(restore_to.as_str()) {
            self.repo.checkout_branch(&restore_to)?;
        }
        run.current_branch = Some(restore_to);

        // Cleanup failure is never a run error
        if self.repo.branch_exists(&run.merged_branch) {
            if let Err(e) = self.repo.delete_branch(&run.merged_branch) {
                debug!(
                    "Could not delete merged branch '{}': {}",
                    run.merged_branch, e
                );
            }
        }

        // Rewritten descendants now sit ahead of their upstreams
        for branch in &run.child_branches {
            if let Ok(status) = classify_branch(self.repo, branch) {
                debug!("post-sync status of '{}': {}", branch, status);
            }
        }

        SyncStateFile::delete(self.repo.path())?;
        self.emit(run, SyncPhase::Success);
        Ok(())
    }
}
