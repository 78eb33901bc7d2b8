use crate::errors::Result;
use std::path::Path;

/// Split of unmerged paths after the resolution cache had its chance
#[derive(Debug, Clone, Default)]
pub struct RerereOutcome {
    /// Files whose conflicts were rewritten in the working tree from a
    /// previously recorded resolution
    pub auto_resolved: Vec<String>,
    /// Files still carrying conflict markers
    pub unresolved: Vec<String>,
}

impl RerereOutcome {
    /// True when every unmerged path was auto-resolved
    pub fn fully_resolved(&self) -> bool {
        self.unresolved.is_empty() && !self.auto_resolved.is_empty()
    }
}

/// Consults git's conflict-pattern store (rerere).
///
/// Rerere applies recorded resolutions to the working tree during the rebase
/// itself; the paths stay unmerged in the index until staged. Whether a
/// recorded resolution was applied is therefore read back from the working
/// tree: a previously conflicted file without markers was resolved by the
/// cache.
pub struct RerereCache {
    enabled: bool,
}

impl RerereCache {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Partition unmerged paths into auto-resolved and unresolved
    pub fn partition(&self, workdir: &Path, unmerged: &[String]) -> Result<RerereOutcome> {
        let mut outcome = RerereOutcome::default();

        if !self.enabled {
            outcome.unresolved = unmerged.to_vec();
            return Ok(outcome);
        }

        for file in unmerged {
            let path = workdir.join(file);
            if path.is_file() && !has_conflict_markers(&std::fs::read_to_string(&path)?) {
                outcome.auto_resolved.push(file.clone());
            } else {
                // Missing files (delete/modify conflicts) always need a human
                outcome.unresolved.push(file.clone());
            }
        }

        Ok(outcome)
    }
}

/// Check a file body for unresolved conflict markers
fn has_conflict_markers(content: &str) -> bool {
    content.lines().any(|line| {
        line.starts_with("<<<<<<<") || line.starts_with("=======") || line.starts_with(">>>>>>>")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_marker_detection() {
        assert!(has_conflict_markers(
            "<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> abc\n"
        ));
        assert!(!has_conflict_markers("plain content\nno markers\n"));
        // A line merely containing an equals run is not a marker
        assert!(!has_conflict_markers("let s = \"=====\";\n"));
    }

    #[test]
    fn test_partition_resolved_and_unresolved() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "resolved.txt", "clean resolution\n");
        write(
            tmp.path(),
            "open.txt",
            "<<<<<<< HEAD\na\n=======\nb\n>>>>>>> other\n",
        );

        let cache = RerereCache::new(true);
        let unmerged = vec!["resolved.txt".to_string(), "open.txt".to_string()];
        let outcome = cache.partition(tmp.path(), &unmerged).unwrap();

        assert_eq!(outcome.auto_resolved, vec!["resolved.txt"]);
        assert_eq!(outcome.unresolved, vec!["open.txt"]);
        assert!(!outcome.fully_resolved());
    }

    #[test]
    fn test_disabled_cache_resolves_nothing() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "resolved.txt", "clean resolution\n");

        let cache = RerereCache::new(false);
        let unmerged = vec!["resolved.txt".to_string()];
        let outcome = cache.partition(tmp.path(), &unmerged).unwrap();

        assert!(outcome.auto_resolved.is_empty());
        assert_eq!(outcome.unresolved, vec!["resolved.txt"]);
    }

    #[test]
    fn test_missing_file_is_unresolved() {
        let tmp = TempDir::new().unwrap();
        let cache = RerereCache::new(true);
        let unmerged = vec!["gone.txt".to_string()];
        let outcome = cache.partition(tmp.path(), &unmerged).unwrap();
        assert_eq!(outcome.unresolved, vec!["gone.txt"]);
    }
}
