use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::gate::{
    should_trigger_pending, CommitStatusUpdate, ConfirmationTarget, PullRequestEvent,
};
use crate::server::{ServerState, ServerStateRef};
use crate::templates::ConfirmTemplate;

pub const MERGE_ALLOWED_MESSAGE: &str = "You may merge your PR now.";

#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmationFailed {
    /// The confirmation URL does not name a valid repository and commit.
    InvalidTarget,
    /// The confirmation was received, but GitHub could not record it.
    StatusNotSet,
}

impl IntoResponse for ConfirmationFailed {
    fn into_response(self) -> Response {
        match self {
            ConfirmationFailed::InvalidTarget => {
                (StatusCode::BAD_REQUEST, "Invalid commit").into_response()
            }
            ConfirmationFailed::StatusNotSet => {
                (StatusCode::INTERNAL_SERVER_ERROR, "An error occurred").into_response()
            }
        }
    }
}

/// Marks the head commit of the pull request as untested, if the event is relevant.
///
/// The status is set on a background task, failures are reported to the `error` listeners.
pub fn handle_pull_request_event(
    state: &ServerStateRef,
    event: PullRequestEvent,
) -> Option<JoinHandle<()>> {
    if !should_trigger_pending(&event, state.allowed_branches()) {
        tracing::debug!(
            "Ignoring `{}` event of {}@{} targeting `{}`",
            event.action.as_str(),
            event.repository,
            event.head_sha,
            event.base_branch
        );
        return None;
    }

    let update = CommitStatusUpdate::untested(&event);
    let span = tracing::info_span!(
        "PendingStatus",
        repo = %update.repository(),
        sha = %update.sha()
    );
    let state = state.clone();
    let task = async move {
        match state.status_client().set_status(&update).await {
            Ok(()) => tracing::info!("Commit marked as untested"),
            Err(error) => state.report_error(error),
        }
    };
    Some(tokio::spawn(task.instrument(span)))
}

pub fn render_confirmation_page(
    default_test: Option<&str>,
    form_action: String,
) -> ConfirmTemplate {
    ConfirmTemplate::new(default_test, form_action)
}

/// Marks the commit from the confirmation URL as tested.
pub async fn confirm_tested(
    state: &ServerState,
    target: &ConfirmationTarget,
) -> Result<&'static str, ConfirmationFailed> {
    if !target.is_valid() {
        tracing::warn!("Rejecting confirmation of invalid commit {target:?}");
        return Err(ConfirmationFailed::InvalidTarget);
    }
    let update = CommitStatusUpdate::tested(target);
    match state.status_client().set_status(&update).await {
        Ok(()) => {
            tracing::info!(
                "Commit {}@{} marked as tested",
                update.repository(),
                update.sha()
            );
            Ok(MERGE_ALLOWED_MESSAGE)
        }
        Err(error) => {
            state.report_error(error);
            Err(ConfirmationFailed::StatusNotSet)
        }
    }
}
