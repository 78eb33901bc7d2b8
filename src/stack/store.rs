use crate::config;
use crate::errors::{RippleError, Result};
use crate::stack::StackSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads and saves the persisted stack configuration.
///
/// `save` is a full-file overwrite. Callers load, mutate in memory, and save;
/// concurrent external mutation of the file is out of scope.
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Create a store rooted at the given repository path
    pub fn new(repo_path: &Path) -> Self {
        Self {
            path: config::stacks_file_path(repo_path),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stack set. Fails when no file exists yet; `init` must run
    /// first.
    pub fn load(&self) -> Result<StackSet> {
        if !self.path.exists() {
            return Err(RippleError::not_initialized(
                "No stack configuration found. Run 'rp init' first.",
            ));
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| RippleError::config(format!("Failed to read stack file: {e}")))?;

        let set: StackSet = serde_json::from_str(&content)
            .map_err(|e| RippleError::config(format!("Failed to parse stack file: {e}")))?;

        set.validate()?;
        Ok(set)
    }

    /// Overwrite the stack file with the given state
    pub fn save(&self, set: &StackSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            config::ensure_config_dir(parent)?;
        }

        let content = serde_json::to_string_pretty(set)
            .map_err(|e| RippleError::config(format!("Failed to serialize stacks: {e}")))?;

        fs::write(&self.path, content)
            .map_err(|e| RippleError::config(format!("Failed to write stack file: {e}")))?;

        tracing::debug!("Saved stack file to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::stack::Stack;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_init_fails() {
        let tmp = TempDir::new().unwrap();
        let store = MetadataStore::new(tmp.path());
        assert!(store.load().is_err());
    }

    #[test]
    fn test_save_load_roundtrip_is_stable() {
        let tmp = TempDir::new().unwrap();
        let store = MetadataStore::new(tmp.path());

        let mut set = StackSet::new(Settings::default());
        let mut stack = Stack::new("feature".to_string(), "main".to_string());
        stack.push_branch("a".to_string()).unwrap();
        stack.push_branch("b".to_string()).unwrap();
        set.add_stack(stack).unwrap();

        store.save(&set).unwrap();
        let loaded = store.load().unwrap();

        // save(load()) with no mutation in between is a no-op
        store.save(&loaded).unwrap();
        let reloaded = store.load().unwrap();

        assert_eq!(reloaded.version, loaded.version);
        assert_eq!(reloaded.settings, loaded.settings);
        assert_eq!(reloaded.stacks.len(), loaded.stacks.len());
        assert_eq!(reloaded.stacks[0].name, "feature");
        assert_eq!(reloaded.stacks[0].branches, vec!["a", "b"]);
        assert_eq!(reloaded.stacks[0].created_at, loaded.stacks[0].created_at);
        assert_eq!(reloaded.stacks[0].updated_at, loaded.stacks[0].updated_at);
    }
}
