use std::fmt::{Debug, Formatter};

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use crate::gate::{PullRequestAction, PullRequestEvent};
use crate::github::{CommitSha, GithubRepoName};
use crate::server::ServerStateRef;

/// GitHub caps webhook payloads at 25 MB.
const MAX_WEBHOOK_BODY_SIZE: usize = 25 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Cannot read webhook body: {0}")]
    Body(String),
    #[error("x-hub-signature-256 header not found")]
    MissingSignature,
    #[error("x-hub-signature-256 does not match the webhook body")]
    InvalidSignature,
    #[error("x-github-event header not found")]
    MissingEventType,
    #[error("Cannot parse webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Invalid repository name `{0}`")]
    InvalidRepository(String),
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest<'a> {
    action: &'a str,
    pull_request: PullRequestPayload,
}

#[derive(serde::Deserialize, Debug)]
struct PullRequestPayload {
    base: BasePayload,
    head: HeadPayload,
}

#[derive(serde::Deserialize, Debug)]
struct BasePayload {
    #[serde(rename = "ref")]
    ref_name: String,
    repo: RepositoryPayload,
}

#[derive(serde::Deserialize, Debug)]
struct RepositoryPayload {
    full_name: String,
}

#[derive(serde::Deserialize, Debug)]
struct HeadPayload {
    sha: String,
}

/// axum extractor for verified GitHub pull request webhook events.
///
/// Deliveries of other event types are acknowledged with `200 OK` without reaching the handler.
/// Rejected deliveries are reported to the `error` listeners of the gate.
#[derive(Debug)]
pub struct GitHubWebhook(pub PullRequestEvent);

#[async_trait]
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = StatusCode;

    async fn from_request(request: Request, state: &ServerStateRef) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        let reject = |error: WebhookError| {
            tracing::error!("Webhook request failed: {error}");
            state.report_error(error);
            StatusCode::BAD_REQUEST
        };

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_SIZE)
            .await
            .map_err(|error| reject(WebhookError::Body(error.to_string())))?;

        // Verify that the request is valid
        verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()).map_err(reject)?;

        // Parse webhook content
        match parse_webhook_event(&parts, &body) {
            Ok(Some(event)) => Ok(GitHubWebhook(event)),
            Ok(None) => Err(StatusCode::OK),
            Err(error) => Err(reject(error)),
        }
    }
}

fn parse_webhook_event(
    parts: &Parts,
    body: &[u8],
) -> Result<Option<PullRequestEvent>, WebhookError> {
    let Some(event_type) = parts.headers.get("x-github-event") else {
        return Err(WebhookError::MissingEventType);
    };

    match event_type.as_bytes() {
        b"pull_request" => {
            let payload: WebhookPullRequest = serde_json::from_slice(body)?;
            let PullRequestPayload { base, head } = payload.pull_request;
            let repository = GithubRepoName::from_full_name(&base.repo.full_name)
                .ok_or(WebhookError::InvalidRepository(base.repo.full_name))?;
            Ok(Some(PullRequestEvent {
                action: PullRequestAction::from(payload.action),
                repository,
                base_branch: base.ref_name,
                head_sha: CommitSha(head.sha),
            }))
        }
        _ => {
            tracing::debug!("Ignoring event type {:?}", event_type.to_str());
            Ok(None)
        }
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> Result<(), WebhookError> {
    let Some(signature) = headers.get("x-hub-signature-256").map(|v| v.as_bytes()) else {
        return Err(WebhookError::MissingSignature);
    };
    let Some(signature) = signature
        .strip_prefix(b"sha256=")
        .and_then(|v| hex::decode(v).ok())
    else {
        return Err(WebhookError::InvalidSignature);
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return Err(WebhookError::InvalidSignature);
    };
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}

impl Debug for WebhookSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret([REDACTED])")
    }
}
