//! Gates merging of pull requests on a manual test of staging.
//!
//! When a pull request is opened, reopened or pushed to, its head commit is marked with a pending
//! status. The status links to a confirmation page, and once a human confirms that they have
//! tested staging, the commit is marked as successful.
//!
//! Mount the router returned by [`create_gate`] (e.g. under `/humans` on `https://example.com`)
//! and register `https://example.com/humans/events` as a webhook for pull request events.
//! GitHub API failures happen outside the request/response cycle, so register an `error`
//! listener on the gate; see [`UnobservedErrorPolicy`] for what happens otherwise.
pub mod config;
pub mod gate;
pub mod github;
pub mod server;
pub mod templates;

pub use config::{AllowedBranches, GateConfig, Location};
pub use github::{AccessToken, WebhookSecret};
pub use server::{
    create_gate, create_gate_with_client, mount_gate, EventSource, GateError, GateRouter,
    UnobservedErrorPolicy, ERROR_EVENT,
};

#[cfg(test)]
mod tests;
