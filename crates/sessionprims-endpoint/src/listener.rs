use std::net::SocketAddr;
use std::sync::Arc;

use sessionprims_transport::{StreamTransport, TransportError, WsTransport};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::{EndpointConfig, Role};
use crate::dispatch::ChannelHandler;
use crate::endpoint::{Endpoint, EndpointBuilder};
use crate::error::{EndpointError, Result};
use crate::events::EndpointObserver;

/// Framing spoken on accepted connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Length-prefixed stream.
    Tcp,
    /// WebSocket upgrade, then one envelope per message.
    WebSocket,
}

/// Listens for and accepts endpoint connections.
///
/// Every accepted endpoint gets the listener's config, observers and
/// handlers. Accepted endpoints run in the server role regardless of the
/// configured role.
pub struct EndpointListener {
    listener: TcpListener,
    mode: ListenMode,
    config: EndpointConfig,
    observers: Vec<Arc<dyn EndpointObserver>>,
    handlers: Vec<(String, Arc<dyn ChannelHandler>)>,
}

impl EndpointListener {
    /// Bind to `addr` (for example `127.0.0.1:0`).
    pub async fn bind(addr: &str, mode: ListenMode) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!(%addr, ?mode, "listening");
        Ok(Self {
            listener,
            mode,
            config: EndpointConfig::server(),
            observers: Vec::new(),
            handlers: Vec::new(),
        })
    }

    /// Override endpoint config for accepted connections.
    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = EndpointConfig {
            role: Role::Server,
            ..config
        };
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn EndpointObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Install `handler` on every accepted endpoint.
    pub fn with_handler<H: ChannelHandler>(mut self, channel: impl Into<String>, handler: H) -> Self {
        self.handlers.push((channel.into(), Arc::new(handler)));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr().map_err(TransportError::Io)?)
    }

    pub fn mode(&self) -> ListenMode {
        self.mode
    }

    /// Accept the next connection and start an endpoint on it.
    ///
    /// Returns once the transport is up; registration completes in the
    /// background. A WebSocket peer that does not finish the opening
    /// handshake within `registration_timeout` is dropped with
    /// [`EndpointError::Timeout`], so callers looping on `accept` move on.
    pub async fn accept(&self) -> Result<Endpoint> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");

        let builder = self.builder();
        match self.mode {
            ListenMode::Tcp => builder.start(
                StreamTransport::from_tcp(stream)?.with_max_payload(self.config.max_message_size),
            ),
            ListenMode::WebSocket => {
                let limit = self.config.registration_timeout;
                let transport = tokio::time::timeout(limit, WsTransport::accept(stream))
                    .await
                    .map_err(|_| {
                        warn!(%peer, ?limit, "websocket handshake timed out");
                        EndpointError::Timeout(limit)
                    })??;
                builder.start(transport.with_peer_addr(peer.to_string()))
            }
        }
    }

    fn builder(&self) -> EndpointBuilder {
        let builder = self
            .observers
            .iter()
            .fold(Endpoint::builder(self.config.clone()), |builder, observer| {
                builder.observer(Arc::clone(observer))
            });
        self.handlers
            .iter()
            .fold(builder, |builder, (channel, handler)| {
                builder.shared_handler(channel.clone(), Arc::clone(handler))
            })
    }
}
