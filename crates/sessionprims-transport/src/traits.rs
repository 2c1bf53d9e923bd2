use std::fmt;
use std::future::Future;

use bytes::Bytes;
use sessionprims_frame::PayloadKind;

use crate::error::Result;

/// How a transport delimits messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Byte stream with length-prefix framing.
    Stream,
    /// Message-oriented WebSocket.
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}

/// One serialized envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A frame from a byte stream, which carries no text/binary distinction.
    Untyped(Bytes),
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Build a payload of the given kind from serialized bytes.
    ///
    /// Text payloads must be valid UTF-8.
    pub fn from_kind(kind: PayloadKind, bytes: Bytes) -> Result<Self> {
        match kind {
            PayloadKind::Binary => Ok(Self::Binary(bytes)),
            PayloadKind::Text => String::from_utf8(Vec::from(bytes))
                .map(Self::Text)
                .map_err(|err| crate::TransportError::InvalidPayload(err.to_string())),
        }
    }

    /// The message kind, if the transport reports one.
    pub fn kind(&self) -> Option<PayloadKind> {
        match self {
            Self::Untyped(_) => None,
            Self::Text(_) => Some(PayloadKind::Text),
            Self::Binary(_) => Some(PayloadKind::Binary),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Untyped(bytes) | Self::Binary(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Untyped(bytes) | Self::Binary(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
        }
    }
}

/// What the receiving half produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(Payload),
    /// Keepalive traffic: an empty frame or a WebSocket ping/pong.
    Ping,
    /// The peer closed the transport, with its reason if it sent one.
    Closed(Option<String>),
}

/// Close status reported to the peer where the transport supports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStatus {
    Normal,
    ProtocolError,
    InternalError,
}

/// Sending half of a transport.
pub trait TransportSink: Send + 'static {
    /// Write one message and wait for the write to complete.
    fn send(&mut self, payload: Payload) -> impl Future<Output = Result<()>> + Send;

    /// Emit keepalive traffic.
    fn ping(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the sending direction.
    fn close(&mut self, status: CloseStatus) -> impl Future<Output = Result<()>> + Send;
}

/// Receiving half of a transport.
pub trait TransportStream: Send + 'static {
    /// Wait for the next inbound item.
    ///
    /// Cancel-safe: dropping the future before completion loses no data.
    fn recv(&mut self) -> impl Future<Output = Result<Inbound>> + Send;
}

/// A connected transport handle, ready to be owned by an endpoint.
pub trait Transport: Send + 'static {
    type Sink: TransportSink;
    type Stream: TransportStream;

    fn kind(&self) -> TransportKind;

    /// Remote address, when known.
    fn peer_addr(&self) -> Option<String>;

    fn split(self) -> (Self::Sink, Self::Stream);
}
