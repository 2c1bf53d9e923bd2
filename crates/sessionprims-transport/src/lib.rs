//! Transport capability for sessionprims endpoints.
//!
//! A transport is split once into a sending half and a receiving half:
//! - [`StreamTransport`] frames payloads over any `AsyncRead + AsyncWrite`
//!   byte stream (TCP, in-memory pipes) with a 4-byte length prefix
//! - [`WsTransport`] maps payloads 1:1 onto WebSocket text or binary messages
//!
//! Everything above this layer is transport-agnostic.

pub mod error;
pub mod stream;
pub mod traits;
pub mod ws;

pub use error::{Result, TransportError};
pub use stream::{StreamSink, StreamSource, StreamTransport};
pub use traits::{
    CloseStatus, Inbound, Payload, Transport, TransportKind, TransportSink, TransportStream,
};
pub use ws::{WsSink, WsSource, WsTransport};
