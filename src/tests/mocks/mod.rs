use std::sync::Arc;

use axum::async_trait;
use parking_lot::Mutex;

use crate::config::{AllowedBranches, GateConfig, Location};
use crate::gate::{CommitStatusUpdate, StatusClient};
use crate::github::{AccessToken, StatusError, WebhookSecret};
use crate::server::{
    EventEmitter, EventSource, ServerState, ServerStateRef, UnobservedErrorPolicy, ERROR_EVENT,
};
use crate::tests::{TEST_ACCESS_TOKEN, TEST_LOCATION, TEST_WEBHOOK_SECRET};

pub use github::{GitHubMockServer, StatusRequest};

mod github;

/// Status client that remembers every update instead of talking to GitHub.
#[derive(Default)]
pub struct RecordingStatusClient {
    updates: Mutex<Vec<CommitStatusUpdate>>,
    fail_with: Option<u16>,
}

impl RecordingStatusClient {
    /// Every update fails as if GitHub responded with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            updates: Default::default(),
            fail_with: Some(status),
        }
    }

    pub fn updates(&self) -> Vec<CommitStatusUpdate> {
        self.updates.lock().clone()
    }

    /// Creates server state backed by `client`, together with a log of emitted errors.
    pub fn state(
        client: Arc<Self>,
        allowed_branches: AllowedBranches,
    ) -> (ServerStateRef, Arc<Mutex<Vec<String>>>) {
        let config = GateConfig::new(
            AccessToken::new(TEST_ACCESS_TOKEN.to_string()),
            WebhookSecret::new(TEST_WEBHOOK_SECRET.to_string()),
            Location::parse(TEST_LOCATION).unwrap(),
        )
        .allowed_branches(allowed_branches);

        let emitter = EventEmitter::new(UnobservedErrorPolicy::Log);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        emitter.on(ERROR_EVENT, move |error| sink.lock().push(error.to_string()));

        let state = ServerStateRef::new(ServerState::new(config, client, emitter));
        (state, errors)
    }
}

#[async_trait]
impl StatusClient for RecordingStatusClient {
    async fn set_status(&self, update: &CommitStatusUpdate) -> Result<(), StatusError> {
        self.updates.lock().push(update.clone());
        match self.fail_with {
            Some(status) => Err(StatusError::Response {
                status: reqwest::StatusCode::from_u16(status).unwrap(),
                body: r#"{"message":"Simulated failure"}"#.to_string(),
            }),
            None => Ok(()),
        }
    }
}
