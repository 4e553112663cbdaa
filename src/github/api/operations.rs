use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use thiserror::Error;

use crate::gate::{CommitStatusUpdate, StatusState};
use crate::github::api::{GithubStatusClient, STATUS_CONTEXT};

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("GitHub responded with {status}: {body}")]
    Response { status: StatusCode, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Refusing to set status of invalid commit `{0}`")]
    InvalidCommit(String),
}

impl StatusError {
    /// Status code of the GitHub response, if a response was received at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StatusError::Response { status, .. } => Some(*status),
            StatusError::Network(error) => error.status(),
            StatusError::InvalidCommit(_) => None,
        }
    }
}

#[derive(serde::Serialize)]
struct CreateStatusRequest<'a> {
    state: StatusState,
    target_url: &'a str,
    description: &'a str,
    context: &'a str,
}

/// Creates a commit status on the commit referenced by `update`.
///
/// Documentation: https://docs.github.com/en/rest/commits/statuses?apiVersion=2022-11-28#create-a-commit-status
pub async fn create_commit_status(
    client: &GithubStatusClient,
    update: &CommitStatusUpdate,
) -> Result<(), StatusError> {
    let repo = update.repository();
    let sha = update.sha();
    if !repo.is_valid() || !sha.is_valid() {
        return Err(StatusError::InvalidCommit(format!("{repo}@{sha}")));
    }

    let mut url = client.api_url().clone();
    url.path_segments_mut()
        .map_err(|_| StatusError::InvalidCommit(format!("{repo}@{sha}")))?
        .pop_if_empty()
        .extend(["repos", repo.owner(), repo.name(), "statuses", sha.as_ref()]);
    let target_url = client.location().confirmation_url(repo, sha);

    let request = CreateStatusRequest {
        state: update.state(),
        target_url: &target_url,
        description: update.description(),
        context: STATUS_CONTEXT,
    };

    tracing::debug!("Setting status of `{sha}` in `{repo}` to {:?}", request.state);

    let response = client
        .http()
        .post(url)
        .header(
            AUTHORIZATION,
            format!("token {}", client.access_token().expose()),
        )
        .json(&request)
        .send()
        .await
        .map_err(|error| {
            tracing::debug!("Setting status of `{sha}` in `{repo}` failed: {error:?}");
            StatusError::Network(error)
        })?;

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => {
            tracing::debug!("Cannot read response body of `{sha}` in `{repo}`: {error:?}");
            format!("<cannot read response body: {error}>")
        }
    };
    tracing::trace!("Response from setting status of `{sha}` in `{repo}`: {status} ({body})");

    if status.is_success() {
        Ok(())
    } else {
        Err(StatusError::Response { status, body })
    }
}
