use anyhow::Context;
use axum::async_trait;
use url::Url;

use crate::config::{GateConfig, Location};
use crate::gate::{CommitStatusUpdate, StatusClient};
use crate::github::AccessToken;

pub(crate) mod operations;

pub use operations::StatusError;

/// Identifies the gate both as the user agent of API requests and as the status context.
pub const STATUS_CONTEXT: &str = "Integration Testing for Humans";

/// Sets commit statuses using the GitHub REST API, authenticated with a personal access token.
pub struct GithubStatusClient {
    client: reqwest::Client,
    api_url: Url,
    access_token: AccessToken,
    location: Location,
}

impl GithubStatusClient {
    pub fn new(config: &GateConfig) -> anyhow::Result<Self> {
        // https://docs.github.com/en/rest/using-the-rest-api/getting-started-with-the-rest-api#user-agent
        let client = reqwest::Client::builder()
            .user_agent(STATUS_CONTEXT)
            .build()
            .context("Cannot build GitHub HTTP client")?;
        let api_url = Url::parse(&config.github_api_url)
            .with_context(|| format!("Invalid GitHub API URL `{}`", config.github_api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("GitHub API URL `{api_url}` cannot have a path");
        }
        Ok(Self {
            client,
            api_url,
            access_token: config.access_token.clone(),
            location: config.location.clone(),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub(crate) fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub(crate) fn location(&self) -> &Location {
        &self.location
    }
}

#[async_trait]
impl StatusClient for GithubStatusClient {
    async fn set_status(&self, update: &CommitStatusUpdate) -> Result<(), StatusError> {
        operations::create_commit_status(self, update).await
    }
}
