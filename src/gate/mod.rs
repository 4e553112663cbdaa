use axum::async_trait;

use crate::github::{CommitSha, GithubRepoName, StatusError};

pub mod event;
pub mod filter;
pub mod handlers;

pub use event::{PullRequestAction, PullRequestEvent};
pub use filter::should_trigger_pending;

/// Sets commit statuses on GitHub.
/// It is behind a trait to allow easier mocking in tests.
#[async_trait]
pub trait StatusClient: Send + Sync {
    /// Performs exactly one attempt to set the status of the commit.
    async fn set_status(&self, update: &CommitStatusUpdate) -> Result<(), StatusError>;
}

/// State of a commit status, as understood by the GitHub statuses API.
#[derive(serde::Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
}

/// Intent to set the status of a single commit.
///
/// An untested update can only be created from a pull request event and a tested one only from
/// a confirmation target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitStatusUpdate {
    repository: GithubRepoName,
    sha: CommitSha,
    tested: bool,
}

impl CommitStatusUpdate {
    pub fn untested(event: &PullRequestEvent) -> Self {
        Self {
            repository: event.repository.clone(),
            sha: event.head_sha.clone(),
            tested: false,
        }
    }

    pub fn tested(target: &ConfirmationTarget) -> Self {
        Self {
            repository: GithubRepoName::new(&target.owner, &target.repo),
            sha: CommitSha(target.sha.clone()),
            tested: true,
        }
    }

    pub fn repository(&self) -> &GithubRepoName {
        &self.repository
    }

    pub fn sha(&self) -> &CommitSha {
        &self.sha
    }

    pub fn is_tested(&self) -> bool {
        self.tested
    }

    pub fn state(&self) -> StatusState {
        if self.tested {
            StatusState::Success
        } else {
            StatusState::Pending
        }
    }

    pub fn description(&self) -> &'static str {
        if self.tested {
            "Tested"
        } else {
            "Untested"
        }
    }
}

/// Commit whose staging test is being confirmed, taken from the path of the confirmation URL.
#[derive(serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationTarget {
    pub owner: String,
    pub repo: String,
    pub sha: String,
}

impl ConfirmationTarget {
    /// Path parameters arrive percent-decoded, so they have to be checked before they end up
    /// in an API URL.
    pub fn is_valid(&self) -> bool {
        GithubRepoName::new(&self.owner, &self.repo).is_valid()
            && CommitSha(self.sha.clone()).is_valid()
    }
}
