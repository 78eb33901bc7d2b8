use crate::errors::{RippleError, Result};
use serde::Deserialize;

/// Lifecycle state of a branch's pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStatus {
    /// PR is open for review
    Open,
    /// PR was merged
    Merged,
    /// PR was closed without merging
    Closed,
    /// PR is open but marked draft
    Draft,
    /// The branch has no PR, a normal, non-exceptional state
    None,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "open",
            PrStatus::Merged => "merged",
            PrStatus::Closed => "closed",
            PrStatus::Draft => "draft",
            PrStatus::None => "none",
        }
    }
}

impl std::fmt::Display for PrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request as reported by the review platform
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub status: PrStatus,
    pub base_ref: String,
    pub labels: Vec<String>,
    pub body: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    number: u64,
    state: String,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    base_ref_name: String,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

impl PullRequest {
    /// Parse the JSON emitted by `gh pr view --json ...`
    pub fn from_view_json(json: &str) -> Result<Self> {
        let raw: RawPullRequest = serde_json::from_str(json)
            .map_err(|e| RippleError::remote(format!("Unexpected gh output: {e}")))?;

        let status = match raw.state.as_str() {
            "MERGED" => PrStatus::Merged,
            "CLOSED" => PrStatus::Closed,
            "OPEN" if raw.is_draft => PrStatus::Draft,
            "OPEN" => PrStatus::Open,
            other => {
                return Err(RippleError::remote(format!("Unknown PR state: {other}")));
            }
        };

        Ok(Self {
            number: raw.number,
            status,
            base_ref: raw.base_ref_name,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            body: raw.body,
            url: raw.url,
        })
    }
}

/// Check whether a label is a stack-position label (`stack:i/n`)
pub fn is_position_label(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("stack:") else {
        return false;
    };
    let Some((pos, len)) = rest.split_once('/') else {
        return false;
    };
    pos.parse::<usize>().is_ok() && len.parse::<usize>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_pr() {
        let json = r#"{
            "number": 42,
            "state": "OPEN",
            "isDraft": false,
            "baseRefName": "main",
            "labels": [{"name": "stack:1/3"}, {"name": "bug"}],
            "body": "Some description",
            "url": "https://github.com/acme/widgets/pull/42"
        }"#;
        let pr = PullRequest::from_view_json(json).unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.status, PrStatus::Open);
        assert_eq!(pr.base_ref, "main");
        assert_eq!(pr.labels, vec!["stack:1/3", "bug"]);
    }

    #[test]
    fn test_parse_draft_and_merged() {
        let draft = r#"{"number": 7, "state": "OPEN", "isDraft": true}"#;
        assert_eq!(
            PullRequest::from_view_json(draft).unwrap().status,
            PrStatus::Draft
        );

        let merged = r#"{"number": 8, "state": "MERGED"}"#;
        assert_eq!(
            PullRequest::from_view_json(merged).unwrap().status,
            PrStatus::Merged
        );
    }

    #[test]
    fn test_parse_unknown_state_fails() {
        let json = r#"{"number": 9, "state": "SUPERSEDED"}"#;
        assert!(PullRequest::from_view_json(json).is_err());
    }

    #[test]
    fn test_position_label_detection() {
        assert!(is_position_label("stack:1/3"));
        assert!(is_position_label("stack:10/12"));
        assert!(!is_position_label("stack:1"));
        assert!(!is_position_label("stack:a/b"));
        assert!(!is_position_label("stacked:1/3"));
        assert!(!is_position_label("bug"));
    }
}
