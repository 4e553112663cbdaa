use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::tests::ASYNC_WAIT_TIMEOUT;

/// A commit status request received by the simulated GitHub API.
#[derive(Debug)]
pub struct StatusRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub body: Value,
}

/// Simulates the commit statuses endpoint of the GitHub REST API.
pub struct GitHubMockServer {
    mock_server: MockServer,
}

impl GitHubMockServer {
    pub async fn start(status: u16) -> Self {
        let mock_server = MockServer::start().await;

        let response = if (200..300).contains(&status) {
            ResponseTemplate::new(status).set_body_json(json!({
                "id": 1,
                "state": "pending",
                "context": "Integration Testing for Humans",
            }))
        } else {
            ResponseTemplate::new(status).set_body_json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest",
            }))
        };
        Mock::given(method("POST"))
            .and(path_regex(r"^/repos/[^/]+/[^/]+/statuses/[^/]+$"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        Self { mock_server }
    }

    pub fn uri(&self) -> String {
        self.mock_server.uri()
    }

    /// All commit status requests received so far, in order.
    pub async fn status_requests(&self) -> Vec<StatusRequest> {
        let requests = self
            .mock_server
            .received_requests()
            .await
            .unwrap_or_default();
        requests
            .into_iter()
            .filter(|request| request.url.path().contains("/statuses/"))
            .map(|request| {
                let header = |name: &str| {
                    request
                        .headers
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(|value| value.to_string())
                };
                StatusRequest {
                    path: request.url.path().to_string(),
                    authorization: header("authorization"),
                    user_agent: header("user-agent"),
                    body: serde_json::from_slice(&request.body).unwrap(),
                }
            })
            .collect()
    }

    /// Method and path of every request received so far, including unexpected ones.
    pub async fn received_paths(&self) -> Vec<String> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.url.path()))
            .collect()
    }

    /// Status updates are sent in the background, so the test has to wait for them.
    pub async fn wait_for_status_requests(&self, count: usize) -> Vec<StatusRequest> {
        let start = tokio::time::Instant::now();
        loop {
            let requests = self.status_requests().await;
            if requests.len() >= count {
                return requests;
            }
            if start.elapsed() > ASYNC_WAIT_TIMEOUT {
                panic!("Expected {count} status request(s), received {requests:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
