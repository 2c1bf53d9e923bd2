//! Lifecycle notifications.
//!
//! Observers are invoked synchronously from the endpoint's own tasks and
//! must not block. [`EventForwarder`] turns notifications into messages on a
//! Tokio channel for consumers that prefer to await them.

use tokio::sync::mpsc;

use crate::endpoint::Endpoint;
use crate::state::ConnectionState;

/// Receives endpoint lifecycle notifications.
pub trait EndpointObserver: Send + Sync + 'static {
    /// Registration completed: the endpoint now goes by `new_id`.
    fn on_connection_registered(&self, _endpoint: &Endpoint, _old_id: &str, _new_id: &str) {}

    /// Fires exactly once per endpoint, after the transport is released.
    fn on_connection_closed(&self, _endpoint: &Endpoint) {}

    fn on_status_change(&self, _endpoint: &Endpoint, _state: ConnectionState) {}
}

/// A lifecycle notification as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    Registered { old_id: String, new_id: String },
    StatusChanged(ConnectionState),
    Closed,
}

/// Forwards notifications to an unbounded channel as
/// `(connection_id, event)` pairs.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    tx: mpsc::UnboundedSender<(String, EndpointEvent)>,
}

impl EventForwarder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, EndpointEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, endpoint: &Endpoint, event: EndpointEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send((endpoint.connection_id(), event));
    }
}

impl EndpointObserver for EventForwarder {
    fn on_connection_registered(&self, endpoint: &Endpoint, old_id: &str, new_id: &str) {
        self.forward(
            endpoint,
            EndpointEvent::Registered {
                old_id: old_id.to_string(),
                new_id: new_id.to_string(),
            },
        );
    }

    fn on_connection_closed(&self, endpoint: &Endpoint) {
        self.forward(endpoint, EndpointEvent::Closed);
    }

    fn on_status_change(&self, endpoint: &Endpoint, state: ConnectionState) {
        self.forward(endpoint, EndpointEvent::StatusChanged(state));
    }
}
