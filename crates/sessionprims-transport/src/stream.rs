use futures_util::{SinkExt, StreamExt};
use sessionprims_frame::LengthCodec;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{
    CloseStatus, Inbound, Payload, Transport, TransportKind, TransportSink, TransportStream,
};

/// Length-prefixed framing over a byte stream.
///
/// Every message is `i32 length (LE) || payload`; an empty frame is a ping.
pub struct StreamTransport<S> {
    io: S,
    codec: LengthCodec,
    peer_addr: Option<String>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(io: S) -> Self {
        Self {
            io,
            codec: LengthCodec::default(),
            peer_addr: None,
        }
    }

    /// Override the largest accepted frame payload, in bytes.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.codec = LengthCodec::new(max_payload);
        self
    }

    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = Some(peer_addr.into());
        self
    }
}

impl StreamTransport<TcpStream> {
    /// Connect over TCP.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        debug!(%addr, "tcp connected");
        Self::from_tcp(stream)
    }

    /// Wrap an accepted or connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?.to_string();
        Ok(Self::new(stream).with_peer_addr(peer_addr))
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    type Sink = StreamSink<S>;
    type Stream = StreamSource<S>;

    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }

    fn split(self) -> (StreamSink<S>, StreamSource<S>) {
        let (read, write) = tokio::io::split(self.io);
        (
            StreamSink {
                inner: FramedWrite::new(write, self.codec.clone()),
            },
            StreamSource {
                inner: FramedRead::new(read, self.codec),
            },
        )
    }
}

/// Writing half of a [`StreamTransport`].
pub struct StreamSink<S> {
    inner: FramedWrite<WriteHalf<S>, LengthCodec>,
}

impl<S> TransportSink for StreamSink<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&mut self, payload: Payload) -> Result<()> {
        self.inner.send(payload.into_bytes()).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        self.inner.send(bytes::Bytes::new()).await?;
        Ok(())
    }

    async fn close(&mut self, _status: CloseStatus) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Reading half of a [`StreamTransport`].
pub struct StreamSource<S> {
    inner: FramedRead<ReadHalf<S>, LengthCodec>,
}

impl<S> TransportStream for StreamSource<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn recv(&mut self) -> Result<Inbound> {
        match self.inner.next().await {
            Some(Ok(frame)) if frame.is_empty() => Ok(Inbound::Ping),
            Some(Ok(frame)) => Ok(Inbound::Message(Payload::Untyped(frame))),
            Some(Err(err)) => Err(err.into()),
            None => Ok(Inbound::Closed(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn pair() -> (
        StreamTransport<tokio::io::DuplexStream>,
        StreamTransport<tokio::io::DuplexStream>,
    ) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (StreamTransport::new(a), StreamTransport::new(b))
    }

    #[tokio::test]
    async fn frames_roundtrip_in_order() {
        let (left, right) = pair();
        let (mut tx, _rx) = left.split();
        let (_tx, mut rx) = right.split();

        tx.send(Payload::Text("first".into())).await.unwrap();
        tx.ping().await.unwrap();
        tx.send(Payload::Binary(Bytes::from_static(&[1, 2, 3])))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            Inbound::Message(Payload::Untyped(Bytes::from_static(b"first")))
        );
        assert_eq!(rx.recv().await.unwrap(), Inbound::Ping);
        assert_eq!(
            rx.recv().await.unwrap(),
            Inbound::Message(Payload::Untyped(Bytes::from_static(&[1, 2, 3])))
        );
    }

    #[tokio::test]
    async fn close_is_seen_as_clean_eof() {
        let (left, right) = pair();
        let (mut tx, _rx) = left.split();
        let (_tx, mut rx) = right.split();

        tx.close(CloseStatus::Normal).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Inbound::Closed(None));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_io_fault() {
        let (mut raw, b) = tokio::io::duplex(1024);
        let (_tx, mut rx) = StreamTransport::new(b).split();

        raw.write_all(&[10, 0, 0, 0, b'x']).await.unwrap();
        drop(raw);

        let err = rx.recv().await.unwrap_err();
        assert!(!err.is_protocol_violation());
    }

    #[tokio::test]
    async fn negative_length_is_a_protocol_violation() {
        let (mut raw, b) = tokio::io::duplex(1024);
        let (_tx, mut rx) = StreamTransport::new(b).split();

        raw.write_all(&(-2i32).to_le_bytes()).await.unwrap();

        let err = rx.recv().await.unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn oversized_frame_rejected_by_receiver() {
        let (a, b) = tokio::io::duplex(1024);
        let (mut tx, _rx) = StreamTransport::new(a).split();
        let (_tx, mut rx) = StreamTransport::new(b).with_max_payload(4).split();

        tx.send(Payload::Untyped(Bytes::from_static(b"too long")))
            .await
            .unwrap();
        assert!(rx.recv().await.unwrap_err().is_protocol_violation());
    }

    #[tokio::test]
    async fn tcp_connect_failure_reports_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match StreamTransport::connect(&addr).await {
            Err(TransportError::Connect { addr: reported, .. }) => assert_eq!(reported, addr),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("connect should fail"),
        }
    }
}
