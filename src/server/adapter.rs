use std::convert::Infallible;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::routing::MethodRouter;
use axum::Router;
use http::Request;
use tower::Service;

use crate::server::emitter::{EventEmitter, EventSource, GateError};
use crate::server::with_gate_layers;

/// Handle that is both an HTTP router and a source of `error` events.
///
/// Routing calls go to the inner [`Router`], listener registration and emission go to the inner
/// [`EventEmitter`]. The two never share storage.
///
/// Every route, including the ones added through [`GateRouter::route`] and
/// [`GateRouter::merge`], runs behind the concurrency limit and the panic handler.
#[derive(Clone)]
pub struct GateRouter {
    router: Router,
    emitter: EventEmitter,
}

impl GateRouter {
    pub fn new(router: Router, emitter: EventEmitter) -> Self {
        Self {
            router: with_gate_layers(router),
            emitter,
        }
    }

    /// Adds a route, see [`Router::route`].
    pub fn route(self, path: &str, method_router: MethodRouter) -> Self {
        self.merge(Router::new().route(path, method_router))
    }

    /// Merges the routes of `other` into the gate, see [`Router::merge`].
    pub fn merge(self, other: Router) -> Self {
        Self {
            router: self.router.merge(with_gate_layers(other)),
            ..self
        }
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Returns the router, e.g. to nest it into a host application.
    /// Listeners stay attached, because the router's handlers share the emitter.
    pub fn into_router(self) -> Router {
        self.router
    }
}

impl EventSource for GateRouter {
    fn on<F>(&self, event: &str, listener: F) -> &Self
    where
        F: Fn(&GateError) + Send + Sync + 'static,
    {
        // The emitter returns itself for chaining, keep chaining on the gate instead.
        let _emitter: &EventEmitter = self.emitter.on(event, listener);
        self
    }

    fn emit(&self, event: &str, error: &GateError) -> bool {
        self.emitter.emit(event, error)
    }

    fn listener_count(&self, event: &str) -> usize {
        self.emitter.listener_count(event)
    }
}

impl From<GateRouter> for Router {
    fn from(gate: GateRouter) -> Self {
        gate.into_router()
    }
}

impl Service<Request<Body>> for GateRouter {
    type Response = <Router as Service<Request<Body>>>::Response;
    type Error = Infallible;
    type Future = <Router as Service<Request<Body>>>::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        <Router as Service<Request<Body>>>::poll_ready(&mut self.router, cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        self.router.call(request)
    }
}
