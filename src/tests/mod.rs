pub(crate) mod mocks;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use parking_lot::Mutex;
use tower::ServiceExt;

use crate::config::{AllowedBranches, GateConfig, Location};
use crate::github::{AccessToken, WebhookSecret};
use crate::server::{create_gate, mount_gate, EventSource, UnobservedErrorPolicy, ERROR_EVENT};
use crate::tests::mocks::GitHubMockServer;

// Public re-exports for use in tests
pub use io::load_test_file;
pub use webhook::{create_webhook_request, TEST_WEBHOOK_SECRET};

/// How long should we wait before we timeout a test.
/// You can increase this if you want to do interactive debugging.
const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How long should we wait for asynchronous side effects (status updates, error events).
const ASYNC_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub const TEST_ACCESS_TOKEN: &str = "test-token";
pub const TEST_LOCATION: &str = "https://example.com/humans";

/// Configures the gate under test and the simulated GitHub API.
pub struct GateBuilder {
    default_test: Option<String>,
    allowed_branches: Vec<String>,
    base_path: String,
    github_status: u16,
}

impl Default for GateBuilder {
    fn default() -> Self {
        Self {
            default_test: None,
            allowed_branches: vec![],
            base_path: "/".to_string(),
            github_status: 201,
        }
    }
}

impl GateBuilder {
    pub fn default_test(self, default_test: &str) -> Self {
        Self {
            default_test: Some(default_test.to_string()),
            ..self
        }
    }

    pub fn allowed_branches(self, branches: &[&str]) -> Self {
        Self {
            allowed_branches: branches.iter().map(|b| b.to_string()).collect(),
            ..self
        }
    }

    pub fn base_path(self, base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            ..self
        }
    }

    /// HTTP status returned by the simulated statuses endpoint.
    pub fn github_status(self, github_status: u16) -> Self {
        Self {
            github_status,
            ..self
        }
    }
}

/// Simple end-to-end test entrypoint.
/// The closure has to give the tester back, so that it is dropped only after the test finishes.
pub async fn run_test<F, Fut>(builder: GateBuilder, f: F)
where
    F: FnOnce(GateTester) -> Fut,
    Fut: Future<Output = GateTester>,
{
    let tester = GateTester::new(builder).await;
    match tokio::time::timeout(TEST_TIMEOUT, f(tester)).await {
        Ok(tester) => tester.finish(),
        Err(_) => panic!("Test has timeouted after {}s", TEST_TIMEOUT.as_secs()),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    pub fn assert_status(&self, status: StatusCode) -> &Self {
        assert_eq!(
            self.status, status,
            "Unexpected response status, body: {}",
            self.body
        );
        self
    }
}

/// Represents a running gate mounted into a host application, talking to a simulated GitHub.
pub struct GateTester {
    app: Router,
    prefix: String,
    github: GitHubMockServer,
    errors: Arc<Mutex<Vec<String>>>,
}

impl GateTester {
    async fn new(builder: GateBuilder) -> Self {
        let github = GitHubMockServer::start(builder.github_status).await;

        let config = GateConfig::new(
            AccessToken::new(TEST_ACCESS_TOKEN.to_string()),
            WebhookSecret::new(TEST_WEBHOOK_SECRET.to_string()),
            Location::parse(TEST_LOCATION).unwrap(),
        )
        .default_test(builder.default_test)
        .allowed_branches(builder.allowed_branches.into_iter().collect::<AllowedBranches>())
        .github_api_url(github.uri());

        let gate = create_gate(config, UnobservedErrorPolicy::Log).unwrap();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        gate.on(ERROR_EVENT, move |error| {
            sink.lock().push(format!("{error}"));
        });

        Self {
            app: mount_gate(&builder.base_path, gate),
            prefix: builder.base_path.trim_end_matches('/').to_string(),
            github,
            errors,
        }
    }

    pub fn github(&self) -> &GitHubMockServer {
        &self.github
    }

    /// Error events received so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Waits until at least `count` error events have been received.
    pub async fn wait_for_errors(&self, count: usize) -> Vec<String> {
        let start = tokio::time::Instant::now();
        loop {
            let errors = self.errors();
            if errors.len() >= count {
                return errors;
            }
            if start.elapsed() > ASYNC_WAIT_TIMEOUT {
                panic!("Expected {count} error event(s), received {errors:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Sends a signed webhook with the payload stored in the given test file.
    pub async fn webhook(&mut self, event: &str, file: &str) -> TestResponse {
        let mut request = create_webhook_request(event, &load_test_file(file));
        *request.uri_mut() = format!("{}/events", self.prefix).parse().unwrap();
        self.send(request).await
    }

    /// Sends a webhook without a signature.
    pub async fn unsigned_webhook(&mut self, event: &str, file: &str) -> TestResponse {
        let mut request = create_webhook_request(event, &load_test_file(file));
        *request.uri_mut() = format!("{}/events", self.prefix).parse().unwrap();
        request.headers_mut().remove("x-hub-signature-256");
        self.send(request).await
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&mut self, path: &str) -> TestResponse {
        self.send(Request::post(path).body(Body::empty()).unwrap())
            .await
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    fn finish(self) {
        drop(self.app);
    }
}
