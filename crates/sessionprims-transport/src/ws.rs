use std::borrow::Cow;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Role};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{
    CloseStatus, Inbound, Payload, Transport, TransportKind, TransportSink, TransportStream,
};

/// WebSocket transport: one payload per WebSocket message.
///
/// Text payloads travel as text messages and binary payloads as binary
/// messages, so the receiver can tell them apart.
pub struct WsTransport<S> {
    ws: WebSocketStream<S>,
    peer_addr: Option<String>,
}

impl<S> WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established WebSocket.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self {
            ws,
            peer_addr: None,
        }
    }

    /// Perform the server side of the opening handshake on `stream`.
    pub async fn accept(stream: S) -> Result<Self> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        Ok(Self::new(ws))
    }

    /// Wrap a stream that already completed the opening handshake.
    pub async fn from_raw_socket(stream: S, role: Role) -> Self {
        Self::new(WebSocketStream::from_raw_socket(stream, role, None).await)
    }

    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = Some(peer_addr.into());
        self
    }
}

impl WsTransport<MaybeTlsStream<TcpStream>> {
    /// Connect to a `ws://` URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| match err {
                tokio_tungstenite::tungstenite::Error::Io(source) => TransportError::Connect {
                    addr: url.to_string(),
                    source,
                },
                other => other.into(),
            })?;
        debug!(%url, "websocket connected");
        Ok(Self::new(ws).with_peer_addr(url))
    }
}

impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Sink = WsSink<S>;
    type Stream = WsSource<S>;

    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }

    fn split(self) -> (WsSink<S>, WsSource<S>) {
        let (sink, stream) = self.ws.split();
        (WsSink { inner: sink }, WsSource { inner: stream })
    }
}

/// Writing half of a [`WsTransport`].
pub struct WsSink<S> {
    inner: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> TransportSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, payload: Payload) -> Result<()> {
        let message = match payload {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(bytes) | Payload::Untyped(bytes) => Message::Binary(bytes.to_vec()),
        };
        self.inner.send(message).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        self.inner.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn close(&mut self, status: CloseStatus) -> Result<()> {
        let code = match status {
            CloseStatus::Normal => CloseCode::Normal,
            CloseStatus::ProtocolError => CloseCode::Protocol,
            CloseStatus::InternalError => CloseCode::Error,
        };
        let frame = CloseFrame {
            code,
            reason: Cow::Borrowed(""),
        };
        match self.inner.send(Message::Close(Some(frame))).await {
            Ok(()) => Ok(()),
            Err(err) => match TransportError::from(err) {
                TransportError::Closed => Ok(()),
                other => Err(other),
            },
        }
    }
}

/// Reading half of a [`WsTransport`].
pub struct WsSource<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

impl<S> TransportStream for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Result<Inbound> {
        loop {
            let message = match self.inner.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => {
                    return match TransportError::from(err) {
                        TransportError::Closed => Ok(Inbound::Closed(None)),
                        other => Err(other),
                    }
                }
                None => return Ok(Inbound::Closed(None)),
            };
            let inbound = match message {
                Message::Text(text) => Inbound::Message(Payload::Text(text)),
                Message::Binary(bytes) => Inbound::Message(Payload::Binary(Bytes::from(bytes))),
                Message::Ping(_) | Message::Pong(_) => Inbound::Ping,
                Message::Close(frame) => Inbound::Closed(
                    frame
                        .map(|frame| frame.reason.into_owned())
                        .filter(|reason| !reason.is_empty()),
                ),
                // Raw frames are never yielded while reading.
                Message::Frame(_) => continue,
            };
            return Ok(inbound);
        }
    }
}
