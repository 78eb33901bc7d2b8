use crate::github::PrStatus;
use crate::stack::Stack;
use crate::sync::poller::BranchInfo;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A tracked branch whose PR transitioned to merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEvent {
    /// Stack the branch belongs to
    pub stack_name: String,
    /// The merged branch
    pub branch: String,
    /// PR number that merged
    pub pr_number: u64,
    /// Ordered suffix of the stack's branches after the merged one
    pub child_branches: Vec<String>,
}

/// Diffs successive PR-status snapshots and queues merge events.
///
/// An event fires iff the previous status was open or draft and the new one
/// is merged; a long-merged branch seen again never re-fires. Simultaneous
/// merges queue, and only one event is surfaced at a time.
#[derive(Default)]
pub struct MergeDetector {
    previous: HashMap<String, PrStatus>,
    queue: VecDeque<MergedEvent>,
}

impl MergeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stack's fresh snapshot; returns how many events were queued
    pub fn observe(&mut self, stack: &Stack, snapshot: &[BranchInfo]) -> usize {
        let mut queued = 0;

        for info in snapshot {
            let prev = self.previous.get(&info.name).copied();
            let fired = matches!(prev, Some(PrStatus::Open) | Some(PrStatus::Draft))
                && info.pr_status == PrStatus::Merged;

            if fired {
                if let Some(pr_number) = info.pr_number {
                    debug!("Detected merge of '{}' (#{})", info.name, pr_number);
                    self.queue.push_back(MergedEvent {
                        stack_name: stack.name.clone(),
                        branch: info.name.clone(),
                        pr_number,
                        child_branches: stack.branches_after(&info.name),
                    });
                    queued += 1;
                }
            }

            self.previous.insert(info.name.clone(), info.pr_status);
        }

        queued
    }

    /// Surface the next queued event; the rest keep waiting
    pub fn next_event(&mut self) -> Option<MergedEvent> {
        self.queue.pop_front()
    }

    /// Branches that a queued sync will rewrite
    pub fn pending_branches(&self) -> HashSet<String> {
        self.queue
            .iter()
            .flat_map(|e| e.child_branches.iter().cloned())
            .collect()
    }

    /// Number of queued events
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Forget recorded status for a branch that is no longer tracked
    pub fn forget(&mut self, branch: &str) {
        self.previous.remove(branch);
    }
}
