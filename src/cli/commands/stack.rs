use crate::cli::output::Output;
use crate::errors::{RippleError, Result};
use crate::git::GitRepository;
use crate::stack::{MetadataStore, Stack, StackSet};
use clap::Subcommand;
use console::style;

/// Stack management actions
#[derive(Debug, Subcommand)]
pub enum StackAction {
    /// Create a new stack
    Create {
        /// Stack name
        name: String,
        /// Base branch (defaults to the configured default base)
        #[arg(long)]
        base: Option<String>,
    },

    /// List all stacks
    List,

    /// Show one stack's branches in order
    Show {
        /// Stack name (defaults to the only stack when unambiguous)
        name: Option<String>,
    },

    /// Track a branch at the top of a stack
    Add {
        /// Branch name
        branch: String,
        /// Stack to add to (defaults to the only stack when unambiguous)
        #[arg(long)]
        stack: Option<String>,
    },

    /// Stop tracking a branch
    Remove {
        /// Branch name
        branch: String,
    },

    /// Delete a stack (branches themselves are untouched)
    Delete {
        /// Stack name
        name: String,
    },
}

/// Run a stack management action
pub async fn run(action: StackAction) -> Result<()> {
    let repo = GitRepository::open_current()?;
    let store = MetadataStore::new(repo.path());

    match action {
        StackAction::Create { name, base } => {
            let mut set = store.load()?;
            let base_branch = base.unwrap_or_else(|| set.settings.default_base_branch.clone());
            if !repo.branch_exists(&base_branch) {
                return Err(RippleError::branch(format!(
                    "Base branch '{base_branch}' does not exist"
                )));
            }
            set.add_stack(Stack::new(name.clone(), base_branch.clone()))?;
            store.save(&set)?;
            Output::success(format!("Created stack '{name}'"));
            Output::sub_item(format!("Base branch: {}", style(&base_branch).cyan()));
        }

        StackAction::List => {
            let set = store.load()?;
            if set.stacks.is_empty() {
                Output::info("No stacks. Create one with 'rp stack create <name>'.");
                return Ok(());
            }
            for stack in &set.stacks {
                println!(
                    "{}  {} branch(es) on {}",
                    style(&stack.name).bold(),
                    stack.len(),
                    style(&stack.base_branch).cyan()
                );
            }
        }

        StackAction::Show { name } => {
            let set = store.load()?;
            let stack = resolve_stack(&set, name.as_deref())?;
            Output::section(format!("Stack: {}", stack.name));
            println!("  {}", style(&stack.base_branch).cyan());
            for branch in &stack.branches {
                let label = stack.position_label(branch).unwrap_or_default();
                println!("    └─ {} {}", branch, style(label).dim());
            }
        }

        StackAction::Add { branch, stack } => {
            if !repo.branch_exists(&branch) {
                return Err(RippleError::branch(format!(
                    "Branch '{branch}' does not exist"
                )));
            }
            let mut set = store.load()?;
            let stack_name = match stack {
                Some(name) => name,
                None => resolve_stack(&set, None)?.name.clone(),
            };
            set.add_branch(&stack_name, branch.clone())?;
            store.save(&set)?;
            Output::success(format!("Tracking '{branch}' in stack '{stack_name}'"));
        }

        StackAction::Remove { branch } => {
            let mut set = store.load()?;
            let stack_name = set
                .stack_for_branch(&branch)
                .map(|s| s.name.clone())
                .ok_or_else(|| {
                    RippleError::branch(format!("Branch '{branch}' is not tracked by any stack"))
                })?;
            let stack = set.get_stack_mut(&stack_name).ok_or_else(|| {
                RippleError::validation(format!("No stack named '{stack_name}'"))
            })?;
            stack.remove_branch(&branch)?;
            store.save(&set)?;
            Output::success(format!("Stopped tracking '{branch}'"));
        }

        StackAction::Delete { name } => {
            let mut set = store.load()?;
            let removed = set.remove_stack(&name)?;
            store.save(&set)?;
            Output::success(format!(
                "Deleted stack '{name}' ({} tracked branch(es) released)",
                removed.len()
            ));
        }
    }
    Ok(())
}

/// Resolve a stack by name, falling back to the only stack when unambiguous
pub fn resolve_stack<'a>(set: &'a StackSet, name: Option<&str>) -> Result<&'a Stack> {
    match name {
        Some(name) => set
            .get_stack(name)
            .ok_or_else(|| RippleError::validation(format!("No stack named '{name}'"))),
        None => match set.stacks.len() {
            0 => Err(RippleError::validation(
                "No stacks exist. Create one with 'rp stack create <name>'.",
            )),
            1 => Ok(&set.stacks[0]),
            _ => Err(RippleError::validation(
                "Multiple stacks exist; pass a stack name",
            )),
        },
    }
}
