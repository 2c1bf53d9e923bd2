use std::time::Duration;

/// Errors that can occur in endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sessionprims_transport::TransportError),

    /// Envelope encoding or decoding failed.
    #[error("frame error: {0}")]
    Frame(#[from] sessionprims_frame::FrameError),

    /// Chunk splitting failed.
    #[error("chunking error: {0}")]
    Chunk(#[from] sessionprims_frame::ChunkError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Registration was rejected or could not complete.
    #[error("registration failed: {0}")]
    Registration(String),

    /// Application handlers cannot use reserved channel names.
    #[error("channel '{0}' is reserved")]
    ReservedChannel(String),

    /// Application envelopes cannot use reserved message types.
    #[error("message type '{0}' is reserved")]
    ReservedMessageType(String),

    /// An encoded wire message exceeds the configured maximum.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The send queue is full.
    #[error("send queue full")]
    QueueFull,

    /// An operation timed out.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint no longer accepts sends.
    #[error("endpoint closed")]
    Closed,

    /// An address could not be parsed.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// The address scheme is recognized but not available in this build.
    #[error("unsupported address scheme '{0}://' (no TLS connector)")]
    UnsupportedScheme(String),
}

pub type Result<T> = std::result::Result<T, EndpointError>;
