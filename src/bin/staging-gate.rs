use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::get;
use clap::Parser;
use http::StatusCode;
use tracing_subscriber::EnvFilter;

use staging_gate::config::DEFAULT_GITHUB_API_URL;
use staging_gate::{
    create_gate, mount_gate, AccessToken, AllowedBranches, EventSource, GateConfig, Location,
    UnobservedErrorPolicy, WebhookSecret, ERROR_EVENT,
};

#[derive(clap::Parser)]
#[command(
    about = "Asks developers to test staging before merging pull requests",
    after_help = "Example: ITFH_GITHUB_ACCESS_TOKEN=... ITFH_GITHUB_WEBHOOK_SECRET=... \
                  staging-gate --location https://example.com --port 3000"
)]
struct Opts {
    /// GitHub access token with the `repo:status` OAuth scope.
    #[arg(long, env = "ITFH_GITHUB_ACCESS_TOKEN")]
    github_access_token: String,

    /// Secret of the pull request webhook. Use the same secret for the webhooks of all
    /// monitored repositories.
    #[arg(long, env = "ITFH_GITHUB_WEBHOOK_SECRET")]
    github_webhook_secret: String,

    /// Full location (origin + base path) of the server, e.g. "https://example.com/humans".
    /// Its path has to end with `--base-path`.
    #[arg(long, env = "ITFH_LOCATION", value_parser = Location::parse)]
    location: Location,

    /// Port on which the server listens.
    #[arg(long, env = "ITFH_PORT")]
    port: u16,

    /// Name of the default test to run on staging before merging, e.g. "Send an email".
    #[arg(long, env = "ITFH_DEFAULT_TEST")]
    default_test: Option<String>,

    /// Only PRs targeting these branches are gated. All PRs are gated if no branch is given.
    #[arg(long = "merge-branch", env = "ITFH_MERGE_BRANCHES", value_delimiter = ',')]
    merge_branches: Vec<String>,

    /// Path under which the gate is mounted.
    #[arg(long, env = "ITFH_BASE_PATH", default_value = "/")]
    base_path: String,

    /// Base URL of the GitHub REST API.
    #[arg(long, env = "ITFH_GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    github_api_url: String,
}

async fn server(opts: Opts) -> anyhow::Result<()> {
    opts.location
        .ensure_serves(&opts.base_path)
        .context("Commit statuses would link to the wrong confirmation page")?;

    let config = GateConfig::new(
        AccessToken::new(opts.github_access_token),
        WebhookSecret::new(opts.github_webhook_secret),
        opts.location,
    )
    .default_test(opts.default_test)
    .allowed_branches(opts.merge_branches.into_iter().collect::<AllowedBranches>())
    .github_api_url(opts.github_api_url);

    let gate = create_gate(config, UnobservedErrorPolicy::Terminate)?
        .route("/health", get(|| async { (StatusCode::OK, "") }));
    gate.on(ERROR_EVENT, |error| {
        tracing::error!("{error:?}");
    });

    let app = mount_gate(&opts.base_path, gate);
    let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    runtime.block_on(server(opts))?;
    tracing::warn!("Server has ended");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
