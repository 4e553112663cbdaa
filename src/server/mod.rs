use std::any::Any;
use std::sync::Arc;

use axum::extract::{OriginalUri, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::{AllowedBranches, GateConfig};
use crate::gate::handlers::{
    confirm_tested, handle_pull_request_event, render_confirmation_page, ConfirmationFailed,
};
use crate::gate::{ConfirmationTarget, StatusClient};
use crate::github::{GitHubWebhook, GithubStatusClient, WebhookSecret};
use crate::templates::HtmlTemplate;

pub mod adapter;
pub mod emitter;

pub use adapter::GateRouter;
pub use emitter::{EventEmitter, EventSource, GateError, UnobservedErrorPolicy, ERROR_EVENT};

/// Shared server state for all axum handlers.
pub struct ServerState {
    client: Arc<dyn StatusClient>,
    emitter: EventEmitter,
    webhook_secret: WebhookSecret,
    default_test: Option<String>,
    allowed_branches: AllowedBranches,
}

impl ServerState {
    pub fn new(config: GateConfig, client: Arc<dyn StatusClient>, emitter: EventEmitter) -> Self {
        let GateConfig {
            access_token: _,
            webhook_secret,
            location: _,
            default_test,
            allowed_branches,
            github_api_url: _,
        } = config;
        Self {
            client,
            emitter,
            webhook_secret,
            default_test,
            allowed_branches,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }

    pub fn status_client(&self) -> &dyn StatusClient {
        self.client.as_ref()
    }

    pub fn default_test(&self) -> Option<&str> {
        self.default_test.as_deref()
    }

    pub fn allowed_branches(&self) -> &AllowedBranches {
        &self.allowed_branches
    }

    /// Forwards an error to the `error` listeners of the gate.
    pub fn report_error(&self, error: impl Into<GateError>) {
        self.emitter.emit_error(error.into());
    }
}

pub type ServerStateRef = Arc<ServerState>;

/// Creates the gate, setting commit statuses through the GitHub API.
pub fn create_gate(config: GateConfig, policy: UnobservedErrorPolicy) -> anyhow::Result<GateRouter> {
    let client = GithubStatusClient::new(&config)?;
    Ok(create_gate_with_client(config, Arc::new(client), policy))
}

pub fn create_gate_with_client(
    config: GateConfig,
    client: Arc<dyn StatusClient>,
    policy: UnobservedErrorPolicy,
) -> GateRouter {
    let emitter = EventEmitter::new(policy);
    let state = ServerState::new(config, client, emitter.clone());

    let router = Router::new()
        .route("/events", post(github_webhook_handler))
        .route("/test/:owner/:repo/build/:sha", get(confirmation_page_handler))
        .route("/test/:owner/:repo/build/:sha/", get(confirmation_page_handler))
        .route(
            "/test/:owner/:repo/build/:sha/tested",
            post(confirmation_handler),
        )
        .with_state(Arc::new(state));
    GateRouter::new(router, emitter)
}

/// Wraps every route of `router` in the gate's middleware.
/// Routes added later to the returned router are not wrapped.
pub(crate) fn with_gate_layers(router: Router) -> Router {
    router
        .layer(ConcurrencyLimitLayer::new(100))
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Mounts the gate under `base_path` of a new host router.
pub fn mount_gate(base_path: &str, gate: GateRouter) -> Router {
    let base_path = base_path.trim_end_matches('/');
    if base_path.is_empty() {
        gate.into_router()
    } else {
        Router::new().nest(base_path, gate.into_router())
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Router panicked: {err:?}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// Axum handler that receives a verified pull request webhook.
/// GitHub gets its answer before the commit status is updated.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    GitHubWebhook(event): GitHubWebhook,
) -> impl IntoResponse {
    handle_pull_request_event(&state, event);
    (StatusCode::OK, "")
}

async fn confirmation_page_handler(
    State(state): State<ServerStateRef>,
    Path(target): Path<ConfirmationTarget>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    if !target.is_valid() {
        return ConfirmationFailed::InvalidTarget.into_response();
    }
    tracing::debug!(
        "Showing confirmation page for {}/{}@{}",
        target.owner,
        target.repo,
        target.sha
    );
    let form_action = format!("{}/tested", uri.path().trim_end_matches('/'));
    HtmlTemplate(render_confirmation_page(state.default_test(), form_action)).into_response()
}

async fn confirmation_handler(
    State(state): State<ServerStateRef>,
    Path(target): Path<ConfirmationTarget>,
) -> Response {
    match confirm_tested(&state, &target).await {
        Ok(message) => (StatusCode::OK, message).into_response(),
        Err(error) => error.into_response(),
    }
}
