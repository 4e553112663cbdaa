use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use thiserror::Error;
use url::Url;

use crate::github::{AccessToken, CommitSha, GithubRepoName, WebhookSecret};

/// Base URL of the GitHub REST API.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid location `{location}`: {error}")]
    InvalidLocation {
        location: String,
        error: url::ParseError,
    },
    #[error("Location `{0}` must be an http(s) URL without query or fragment")]
    UnsupportedLocation(String),
    #[error("Location `{location}` does not end with the base path `{base_path}`")]
    BasePathMismatch { location: String, base_path: String },
}

/// The full location (origin + mount path) under which the gate is reachable,
/// e.g. `https://example.com/humans`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location(Url);

impl Location {
    pub fn parse(location: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(location).map_err(|error| ConfigError::InvalidLocation {
            location: location.to_string(),
            error,
        })?;
        if !matches!(url.scheme(), "http" | "https")
            || url.query().is_some()
            || url.fragment().is_some()
        {
            return Err(ConfigError::UnsupportedLocation(location.to_string()));
        }
        Ok(Self(url))
    }

    /// Path of the location without the trailing slash, empty for the root.
    pub fn path(&self) -> &str {
        self.0.path().trim_end_matches('/')
    }

    /// Checks that the gate, mounted under `base_path`, is reachable through this location.
    pub fn ensure_serves(&self, base_path: &str) -> Result<(), ConfigError> {
        let base_path = base_path.trim_end_matches('/');
        if self.path().ends_with(base_path) {
            Ok(())
        } else {
            Err(ConfigError::BasePathMismatch {
                location: self.to_string(),
                base_path: base_path.to_string(),
            })
        }
    }

    /// Link to the confirmation page of the given commit.
    pub fn confirmation_url(&self, repo: &GithubRepoName, sha: &CommitSha) -> String {
        let mut url = self.0.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["test", repo.owner(), repo.name(), "build", sha.as_ref()]);
        }
        url.to_string()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str().trim_end_matches('/'))
    }
}

/// Branches that pull requests have to target in order to be gated.
/// An empty set means that every branch is gated.
#[derive(Clone, Debug, Default)]
pub struct AllowedBranches(HashSet<String>);

impl AllowedBranches {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn allows(&self, branch: &str) -> bool {
        self.0.is_empty() || self.0.contains(branch)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AllowedBranches {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(Into::<String>::into)
                .filter(|branch| !branch.is_empty())
                .collect(),
        )
    }
}

/// Configuration of the gate, created once at start-up.
#[derive(Debug)]
pub struct GateConfig {
    pub access_token: AccessToken,
    pub webhook_secret: WebhookSecret,
    pub location: Location,
    /// Name of the test that should be performed on staging, e.g. "Send an email".
    /// It is rendered as HTML.
    pub default_test: Option<String>,
    pub allowed_branches: AllowedBranches,
    pub github_api_url: String,
}

impl GateConfig {
    pub fn new(
        access_token: AccessToken,
        webhook_secret: WebhookSecret,
        location: Location,
    ) -> Self {
        Self {
            access_token,
            webhook_secret,
            location,
            default_test: None,
            allowed_branches: AllowedBranches::all(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }

    pub fn default_test(self, default_test: Option<String>) -> Self {
        Self {
            default_test,
            ..self
        }
    }

    pub fn allowed_branches(self, allowed_branches: AllowedBranches) -> Self {
        Self {
            allowed_branches,
            ..self
        }
    }

    pub fn github_api_url(self, github_api_url: String) -> Self {
        Self {
            github_api_url,
            ..self
        }
    }
}
