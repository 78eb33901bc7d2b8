use crate::github::pr::{is_position_label, PrStatus};
use crate::github::GhClient;
use crate::stack::Stack;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Markers delimiting the generated stack block in a PR description
pub const STACK_BLOCK_BEGIN: &str = "<!-- ripple:stack:begin -->";
pub const STACK_BLOCK_END: &str = "<!-- ripple:stack:end -->";

/// Per-branch result of a metadata pass. The three sub-operations are
/// independently best-effort; `success` is false only when the base
/// retarget itself failed.
#[derive(Debug, Clone)]
pub struct PrSyncReport {
    pub branch: String,
    pub pr_number: Option<u64>,
    pub retargeted: bool,
    pub relabeled: bool,
    pub body_updated: bool,
    pub success: bool,
    pub failures: Vec<String>,
}

impl PrSyncReport {
    fn untouched(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            pr_number: None,
            retargeted: false,
            relabeled: false,
            body_updated: false,
            success: true,
            failures: Vec::new(),
        }
    }
}

/// Brings every affected PR back in line with the stack after a sync:
/// base branches, stack-position labels and the description stack block.
pub struct PrMetadataSynchronizer<'a> {
    client: &'a GhClient,
}

impl<'a> PrMetadataSynchronizer<'a> {
    pub fn new(client: &'a GhClient) -> Self {
        Self { client }
    }

    /// Update every branch of the stack. One branch's failures never block
    /// another's updates.
    pub async fn sync_stack(&self, stack: &Stack) -> Vec<PrSyncReport> {
        // One parallel sweep for PR state; the per-branch passes reuse it so
        // the stack block can name sibling PR numbers.
        let fetched = join_all(
            stack
                .branches
                .iter()
                .map(|branch| self.client.pr_for_branch(branch)),
        )
        .await;

        let mut prs = HashMap::new();
        for (branch, result) in stack.branches.iter().zip(fetched) {
            match result {
                Ok(Some(pr)) => {
                    prs.insert(branch.clone(), pr);
                }
                Ok(None) => {}
                Err(e) => warn!("Could not fetch PR for '{}': {}", branch, e),
            }
        }

        let numbers: HashMap<String, u64> = prs
            .iter()
            .map(|(branch, pr)| (branch.clone(), pr.number))
            .collect();

        let mut reports = Vec::new();
        for branch in &stack.branches {
            let report = match prs.get(branch) {
                Some(pr) if matches!(pr.status, PrStatus::Open | PrStatus::Draft) => {
                    self.sync_branch(stack, branch, pr, &numbers).await
                }
                Some(_) | None => {
                    debug!("No open PR for '{}'; skipping metadata update", branch);
                    PrSyncReport::untouched(branch)
                }
            };
            reports.push(report);
        }
        reports
    }

    async fn sync_branch(
        &self,
        stack: &Stack,
        branch: &str,
        pr: &crate::github::PullRequest,
        numbers: &HashMap<String, u64>,
    ) -> PrSyncReport {
        let mut report = PrSyncReport::untouched(branch);
        report.pr_number = Some(pr.number);

        // Base retarget: the one sub-operation whose failure fails the pass
        if let Some(expected_base) = stack.parent_of(branch) {
            if pr.base_ref != expected_base {
                match self.client.retarget_base(pr.number, expected_base).await {
                    Ok(()) => report.retargeted = true,
                    Err(e) => {
                        report.success = false;
                        report.failures.push(format!("base: {e}"));
                    }
                }
            }
        }

        // Stack-position label: replace any stale position label
        if let Some(fresh) = stack.position_label(branch) {
            let mut label_failures = Vec::new();
            for stale in pr
                .labels
                .iter()
                .filter(|l| is_position_label(l) && **l != fresh)
            {
                if let Err(e) = self.client.remove_label(pr.number, stale).await {
                    label_failures.push(format!("label -{stale}: {e}"));
                }
            }
            if !pr.labels.contains(&fresh) {
                match self.client.add_label(pr.number, &fresh).await {
                    Ok(()) => report.relabeled = true,
                    Err(e) => label_failures.push(format!("label +{fresh}: {e}")),
                }
            }
            report.failures.extend(label_failures);
        }

        // Description stack block
        let block = render_stack_block(stack, branch, numbers);
        let new_body = splice_stack_block(&pr.body, &block);
        if new_body != pr.body {
            match self.client.update_body(pr.number, &new_body).await {
                Ok(()) => report.body_updated = true,
                Err(e) => report.failures.push(format!("body: {e}")),
            }
        }

        for failure in &report.failures {
            warn!("PR #{} metadata: {}", pr.number, failure);
        }
        report
    }
}

/// Render the stack-visualization block for one branch's description
pub fn render_stack_block(
    stack: &Stack,
    current: &str,
    numbers: &HashMap<String, u64>,
) -> String {
    let mut block = String::new();
    block.push_str(STACK_BLOCK_BEGIN);
    block.push_str("\n### Stack\n\n");
    block.push_str(&format!("- `{}` (base)\n", stack.base_branch));

    for (i, branch) in stack.branches.iter().enumerate() {
        let pr_ref = numbers
            .get(branch)
            .map(|n| format!(" — #{n}"))
            .unwrap_or_default();
        let marker = if branch == current { " ← this PR" } else { "" };
        block.push_str(&format!("  {}. `{branch}`{pr_ref}{marker}\n", i + 1));
    }

    block.push_str(STACK_BLOCK_END);
    block
}

/// Replace the existing stack block in a body, or append one
pub fn splice_stack_block(body: &str, block: &str) -> String {
    if let (Some(begin), Some(end)) = (body.find(STACK_BLOCK_BEGIN), body.find(STACK_BLOCK_END)) {
        if begin < end {
            let mut out = String::new();
            out.push_str(&body[..begin]);
            out.push_str(block);
            out.push_str(&body[end + STACK_BLOCK_END.len()..]);
            return out;
        }
    }

    if body.trim().is_empty() {
        block.to_string()
    } else {
        format!("{}\n\n{}", body.trim_end(), block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_abc() -> Stack {
        let mut stack = Stack::new("feature".to_string(), "main".to_string());
        for b in ["a", "b", "c"] {
            stack.push_branch(b.to_string()).unwrap();
        }
        stack
    }

    #[test]
    fn test_render_marks_current_branch() {
        let stack = stack_abc();
        let numbers = HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);

        let block = render_stack_block(&stack, "b", &numbers);
        assert!(block.starts_with(STACK_BLOCK_BEGIN));
        assert!(block.ends_with(STACK_BLOCK_END));
        assert!(block.contains("- `main` (base)"));
        assert!(block.contains("1. `a` — #1\n"));
        assert!(block.contains("2. `b` — #2 ← this PR\n"));
        // No PR yet for c: rendered without a number
        assert!(block.contains("3. `c`\n"));
    }

    #[test]
    fn test_splice_appends_when_absent() {
        let body = "Implements the widget.";
        let spliced = splice_stack_block(body, "BLOCK");
        assert_eq!(spliced, "Implements the widget.\n\nBLOCK");

        assert_eq!(splice_stack_block("", "BLOCK"), "BLOCK");
    }

    #[test]
    fn test_splice_replaces_existing_block() {
        let stack = stack_abc();
        let old = render_stack_block(&stack, "a", &HashMap::new());
        let body = format!("Intro text.\n\n{old}\n\nTrailing notes.");

        let fresh = render_stack_block(&stack, "a", &HashMap::from([("a".to_string(), 9)]));
        let spliced = splice_stack_block(&body, &fresh);

        assert!(spliced.contains("Intro text."));
        assert!(spliced.contains("Trailing notes."));
        assert!(spliced.contains("#9"));
        assert_eq!(spliced.matches(STACK_BLOCK_BEGIN).count(), 1);
    }
}
