use crate::github::{CommitSha, GithubRepoName};

/// Action of a `pull_request` webhook event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullRequestAction {
    Opened,
    Reopened,
    /// Someone pushed to the PR branch.
    Synchronize,
    /// Any other action (`closed`, `labeled`, `edited`, ...).
    Other(String),
}

impl From<&str> for PullRequestAction {
    fn from(action: &str) -> Self {
        match action {
            "opened" => Self::Opened,
            "reopened" => Self::Reopened,
            "synchronize" => Self::Synchronize,
            other => Self::Other(other.to_string()),
        }
    }
}

impl PullRequestAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Opened => "opened",
            Self::Reopened => "reopened",
            Self::Synchronize => "synchronize",
            Self::Other(action) => action,
        }
    }
}

/// A pull request lifecycle event, received from a verified webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    /// Repository the pull request is merged into.
    pub repository: GithubRepoName,
    pub base_branch: String,
    pub head_sha: CommitSha,
}
