//! Contains definitions of common types (repository name, commit SHA, access token) needed
//! for working with GitHub repositories.
use std::fmt::{Debug, Display, Formatter};

use secrecy::{ExposeSecret, SecretString};

pub mod api;
pub mod webhook;

pub use api::{GithubStatusClient, StatusError};
pub use webhook::{GitHubWebhook, WebhookError, WebhookSecret};

/// Unique identifier of a GitHub repository.
///
/// Unlike GitHub itself, the name is kept exactly as received, because it is echoed back
/// into the confirmation link of a commit status.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GithubRepoName {
    owner: String,
    name: String,
}

impl GithubRepoName {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Parses a `owner/name` full name, as found in webhook payloads.
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.split_once('/')?;
        let repo = Self::new(owner, name);
        repo.is_valid().then_some(repo)
    }

    /// Owner and name are restricted to the characters GitHub allows in them.
    pub fn is_valid(&self) -> bool {
        is_valid_name(&self.owner) && is_valid_name(&self.name)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for GithubRepoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.owner, self.name))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSha(pub String);

impl CommitSha {
    /// Full or abbreviated hexadecimal object id (SHA-1 or SHA-256).
    pub fn is_valid(&self) -> bool {
        (1..=64).contains(&self.0.len()) && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl From<String> for CommitSha {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl AsRef<str> for CommitSha {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
impl Display for CommitSha {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Personal access token with the `repo:status` scope.
/// It can be exposed only through the [`AccessToken::expose`] method.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}
