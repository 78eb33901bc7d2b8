use crate::config::Settings;
use crate::errors::{RippleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for the persisted stack file
pub const STACK_SET_VERSION: u32 = 1;

/// An ordered chain of dependent branches rooted at a base branch.
///
/// Position encodes direct dependency: `branches[i]`'s parent is
/// `branches[i-1]`, or `base_branch` for the first entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    /// Human-readable name for the stack (unique key)
    pub name: String,
    /// Base branch this stack is built on (never itself a tracked member)
    pub base_branch: String,
    /// Ordered branch names, bottom of the stack first
    pub branches: Vec<String>,
    /// When this stack was created
    pub created_at: DateTime<Utc>,
    /// When this stack was last updated
    pub updated_at: DateTime<Utc>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new(name: String, base_branch: String) -> Self {
        let now = Utc::now();
        Self {
            name,
            base_branch,
            branches: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of branches in the stack
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Check if the stack has no branches
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Check whether a branch is tracked by this stack
    pub fn contains(&self, branch: &str) -> bool {
        self.branches.iter().any(|b| b == branch)
    }

    /// Position of a branch in the sequence
    pub fn index_of(&self, branch: &str) -> Option<usize> {
        self.branches.iter().position(|b| b == branch)
    }

    /// The parent of a branch: the previous sequence entry, or the base
    /// branch for the first entry.
    pub fn parent_of(&self, branch: &str) -> Option<&str> {
        let idx = self.index_of(branch)?;
        if idx == 0 {
            Some(self.base_branch.as_str())
        } else {
            Some(self.branches[idx - 1].as_str())
        }
    }

    /// The exact ordered suffix of branches strictly after the given branch.
    /// Empty for the stack's tip.
    pub fn branches_after(&self, branch: &str) -> Vec<String> {
        match self.index_of(branch) {
            Some(idx) => self.branches[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// One-based position and stack length, e.g. `(2, 5)`.
    pub fn position_of(&self, branch: &str) -> Option<(usize, usize)> {
        self.index_of(branch).map(|i| (i + 1, self.branches.len()))
    }

    /// Stack-position label of the form `stack:i/n`
    pub fn position_label(&self, branch: &str) -> Option<String> {
        self.position_of(branch)
            .map(|(pos, len)| format!("stack:{pos}/{len}"))
    }

    /// Append a branch to the top of the stack
    pub fn push_branch(&mut self, branch: String) -> Result<()> {
        if branch == self.base_branch {
            return Err(RippleError::validation(format!(
                "'{branch}' is the stack's base branch and cannot be tracked as a member"
            )));
        }
        if self.contains(&branch) {
            return Err(RippleError::validation(format!(
                "Branch '{branch}' is already in stack '{}'",
                self.name
            )));
        }
        self.branches.push(branch);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a branch from the sequence, preserving the order of the rest
    pub fn remove_branch(&mut self, branch: &str) -> Result<()> {
        let idx = self.index_of(branch).ok_or_else(|| {
            RippleError::branch(format!(
                "Branch '{branch}' is not tracked by stack '{}'",
                self.name
            ))
        })?;
        self.branches.remove(idx);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate the stack's structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.contains(&self.base_branch) {
            return Err(RippleError::validation(format!(
                "Stack '{}': base branch '{}' is also tracked as a member",
                self.name, self.base_branch
            )));
        }
        for (i, branch) in self.branches.iter().enumerate() {
            if self.branches[i + 1..].contains(branch) {
                return Err(RippleError::validation(format!(
                    "Stack '{}': branch '{branch}' appears more than once",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// The complete persisted state: every stack plus global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSet {
    /// Schema version tag
    pub version: u32,
    /// All tracked stacks, in creation order
    pub stacks: Vec<Stack>,
    /// Global settings
    pub settings: Settings,
}

impl StackSet {
    /// Create a new stack set with default settings
    pub fn new(settings: Settings) -> Self {
        Self {
            version: STACK_SET_VERSION,
            stacks: Vec::new(),
            settings,
        }
    }

    /// Find a stack by name
    pub fn get_stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Find a stack by name, mutably
    pub fn get_stack_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.iter_mut().find(|s| s.name == name)
    }

    /// Find the stack tracking a given branch, if any
    pub fn stack_for_branch(&self, branch: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.contains(branch))
    }

    /// Add a new stack. Fails if the name is taken or any of its branches is
    /// already tracked elsewhere (multi-stack membership is unsupported).
    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        stack.validate()?;
        if self.get_stack(&stack.name).is_some() {
            return Err(RippleError::validation(format!(
                "A stack named '{}' already exists",
                stack.name
            )));
        }
        for branch in &stack.branches {
            if let Some(other) = self.stack_for_branch(branch) {
                return Err(RippleError::validation(format!(
                    "Branch '{branch}' is already tracked by stack '{}'",
                    other.name
                )));
            }
        }
        self.stacks.push(stack);
        Ok(())
    }

    /// Remove a stack by name
    pub fn remove_stack(&mut self, name: &str) -> Result<Stack> {
        let idx = self
            .stacks
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RippleError::validation(format!("No stack named '{name}'")))?;
        Ok(self.stacks.remove(idx))
    }

    /// Add a branch to a named stack, enforcing single-stack membership
    pub fn add_branch(&mut self, stack_name: &str, branch: String) -> Result<()> {
        if let Some(other) = self.stack_for_branch(&branch) {
            return Err(RippleError::validation(format!(
                "Branch '{branch}' is already tracked by stack '{}'",
                other.name
            )));
        }
        let stack = self
            .get_stack_mut(stack_name)
            .ok_or_else(|| RippleError::validation(format!("No stack named '{stack_name}'")))?;
        stack.push_branch(branch)
    }

    /// Validate every stack and the cross-stack membership invariant
    pub fn validate(&self) -> Result<()> {
        for stack in &self.stacks {
            stack.validate()?;
            for branch in &stack.branches {
                let owners = self
                    .stacks
                    .iter()
                    .filter(|s| s.contains(branch))
                    .count();
                if owners > 1 {
                    return Err(RippleError::validation(format!(
                        "Branch '{branch}' belongs to more than one stack"
                    )));
                }
            }
        }
        Ok(())
    }
}
