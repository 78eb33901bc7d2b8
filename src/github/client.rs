use crate::errors::{RippleError, Result};
use crate::github::pr::PullRequest;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

const PR_VIEW_FIELDS: &str = "number,state,isDraft,baseRefName,labels,body,url";

/// Client for the review platform's CLI (`gh`), invoked as a subprocess.
pub struct GhClient {
    workdir: PathBuf,
}

impl GhClient {
    /// Create a client operating in the given repository
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!("gh {}", args.join(" "));
        let output = Command::new("gh")
            .args(args)
            .current_dir(&self.workdir)
            .env("GH_PROMPT_DISABLED", "1")
            .env("NO_COLOR", "1")
            .output()
            .await
            .map_err(|e| RippleError::remote(format!("Failed to run gh: {e}")))?;
        Ok(output)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RippleError::remote(format!(
                "gh {} failed: {}",
                args.join(" "),
                stderr.trim()
            )))
        }
    }

    /// Fetch the pull request for a branch. A branch without a PR yields
    /// `None`, never an error.
    pub async fn pr_for_branch(&self, branch: &str) -> Result<Option<PullRequest>> {
        let output = self
            .output(&["pr", "view", branch, "--json", PR_VIEW_FIELDS])
            .await?;

        if output.status.success() {
            let json = String::from_utf8_lossy(&output.stdout);
            return Ok(Some(PullRequest::from_view_json(&json)?));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no pull requests found") {
            Ok(None)
        } else {
            Err(RippleError::remote(format!(
                "gh pr view {branch} failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Retarget a PR's base branch
    pub async fn retarget_base(&self, number: u64, base: &str) -> Result<()> {
        self.run(&["pr", "edit", &number.to_string(), "--base", base])
            .await?;
        Ok(())
    }

    /// Add a label to a PR
    pub async fn add_label(&self, number: u64, label: &str) -> Result<()> {
        self.run(&["pr", "edit", &number.to_string(), "--add-label", label])
            .await?;
        Ok(())
    }

    /// Remove a label from a PR
    pub async fn remove_label(&self, number: u64, label: &str) -> Result<()> {
        self.run(&["pr", "edit", &number.to_string(), "--remove-label", label])
            .await?;
        Ok(())
    }

    /// Overwrite a PR's description body
    pub async fn update_body(&self, number: u64, body: &str) -> Result<()> {
        self.run(&["pr", "edit", &number.to_string(), "--body", body])
            .await?;
        Ok(())
    }

    /// Create a PR with an explicit base, title, body and optional label
    pub async fn create_pr(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
        label: Option<&str>,
        draft: bool,
    ) -> Result<()> {
        let mut args = vec![
            "pr", "create", "--head", head, "--base", base, "--title", title, "--body", body,
        ];
        if let Some(label) = label {
            args.push("--label");
            args.push(label);
        }
        if draft {
            args.push("--draft");
        }
        self.run(&args).await?;
        Ok(())
    }

    /// Open a branch's PR in the browser
    pub async fn open_in_browser(&self, branch: &str) -> Result<()> {
        self.run(&["pr", "view", branch, "--web"]).await?;
        Ok(())
    }
}
