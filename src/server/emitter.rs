use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::github::{StatusError, WebhookError};

/// Name of the event emitted for failures that happen outside of a request/response cycle.
pub const ERROR_EVENT: &str = "error";

/// Failure reported to `error` listeners.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Webhook delivery rejected: {0}")]
    Webhook(#[from] WebhookError),
    #[error("Cannot set commit status: {0}")]
    StatusApi(#[from] StatusError),
}

pub type Listener = Arc<dyn Fn(&GateError) + Send + Sync>;

/// Something that listeners can subscribe to by event name.
pub trait EventSource {
    /// Registers `listener` for `event`. Returns the receiver so that registrations can be
    /// chained.
    fn on<F>(&self, event: &str, listener: F) -> &Self
    where
        F: Fn(&GateError) + Send + Sync + 'static;

    /// Calls all listeners of `event` in registration order.
    /// Returns `false` if there was no listener.
    fn emit(&self, event: &str, error: &GateError) -> bool;

    fn listener_count(&self, event: &str) -> usize;
}

/// What happens to an error that is emitted while nobody listens for `error` events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnobservedErrorPolicy {
    /// Log the error and exit the process with a non-zero code.
    #[default]
    Terminate,
    /// Log the error and carry on.
    Log,
}

/// Named event listeners. Clones share the same listener table.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<RwLock<HashMap<String, Vec<Listener>>>>,
    policy: UnobservedErrorPolicy,
}

impl EventEmitter {
    pub fn new(policy: UnobservedErrorPolicy) -> Self {
        Self {
            listeners: Default::default(),
            policy,
        }
    }

    pub fn policy(&self) -> UnobservedErrorPolicy {
        self.policy
    }

    /// Emits `error` as an [`ERROR_EVENT`], falling back to the unobserved error policy.
    pub fn emit_error(&self, error: GateError) {
        if self.emit(ERROR_EVENT, &error) {
            return;
        }
        match self.policy {
            UnobservedErrorPolicy::Log => {
                tracing::error!("Unobserved error: {error:?}");
            }
            UnobservedErrorPolicy::Terminate => {
                tracing::error!("No `{ERROR_EVENT}` listener is registered, terminating: {error:?}");
                std::process::exit(1);
            }
        }
    }
}

impl EventSource for EventEmitter {
    fn on<F>(&self, event: &str, listener: F) -> &Self
    where
        F: Fn(&GateError) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(listener));
        self
    }

    fn emit(&self, event: &str, error: &GateError) -> bool {
        // Listeners run without the lock held, so they may register further listeners.
        let listeners = match self.listeners.read().get(event) {
            Some(listeners) => listeners.clone(),
            None => return false,
        };
        for listener in &listeners {
            listener(error);
        }
        !listeners.is_empty()
    }

    fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}
