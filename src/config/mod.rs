pub mod settings;

pub use settings::{Settings, RerereSettings, DEFAULT_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};

use crate::errors::{RippleError, Result};
use crate::stack::{StackSet, MetadataStore};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the Ripple configuration directory for a repository (<repo>/.ripple/)
pub fn get_repo_config_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(".ripple")
}

/// Path of the persisted stack file for a repository
pub fn stacks_file_path(repo_path: &Path) -> PathBuf {
    get_repo_config_dir(repo_path).join("stacks.json")
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir).map_err(|e| {
            RippleError::config(format!("Failed to create config directory: {e}"))
        })?;
    }
    Ok(())
}

/// Check if a repository is initialized for Ripple
pub fn is_repo_initialized(repo_path: &Path) -> bool {
    stacks_file_path(repo_path).exists()
}

/// Initialize a repository for Ripple
pub fn initialize_repo(repo_path: &Path, default_base_branch: Option<String>, force: bool) -> Result<()> {
    if is_repo_initialized(repo_path) && !force {
        return Err(RippleError::config(
            "Repository is already initialized. Use --force to reinitialize.",
        ));
    }

    ensure_config_dir(&get_repo_config_dir(repo_path))?;

    let mut settings = Settings::default();
    if let Some(base) = default_base_branch {
        settings.default_base_branch = base;
    }
    settings.validate()?;

    let store = MetadataStore::new(repo_path);
    store.save(&StackSet::new(settings))?;

    tracing::info!("Initialized Ripple repository at {}", repo_path.display());
    Ok(())
}
