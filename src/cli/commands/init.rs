use crate::cli::output::Output;
use crate::config;
use crate::errors::{RippleError, Result};
use crate::git;

/// Initialize the current repository for Ripple
pub async fn run(default_base_branch: Option<String>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()
        .map_err(|e| RippleError::config(format!("Could not get current directory: {e}")))?;
    let repo_root = git::find_repository_root(&current_dir)?;

    config::initialize_repo(&repo_root, default_base_branch, force)?;

    // The stack file is local-only; keep it out of version control
    if let Err(e) = exclude_from_git(&repo_root) {
        Output::warning(format!("Could not update .git/info/exclude: {e}"));
    }

    Output::success(format!(
        "Initialized Ripple in {}",
        repo_root.display()
    ));
    Output::sub_item("Stack file: .ripple/stacks.json");
    Output::next_steps(&[
        "Create a stack: rp stack create <name>",
        "Track branches: rp stack add <branch>",
        "Start watching for merges: rp watch",
    ]);
    Ok(())
}

fn exclude_from_git(repo_root: &std::path::Path) -> Result<()> {
    let exclude_path = git::resolve_git_dir(repo_root)?.join("info").join("exclude");

    if let Ok(existing) = std::fs::read_to_string(&exclude_path) {
        if existing.lines().any(|l| l.trim() == ".ripple/") {
            return Ok(());
        }
    }

    if let Some(parent) = exclude_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&exclude_path)?;
    writeln!(file, ".ripple/")?;
    Ok(())
}
