use sessionprims_codec::CodecError;

use crate::envelope::PayloadKind;

/// Errors that can occur during frame and envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header announces a negative payload length.
    #[error("invalid frame length {0}")]
    InvalidLength(i32),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// A binary envelope could not be decoded.
    #[error("binary envelope decode failed: {0}")]
    Codec(#[from] CodecError),

    /// A JSON envelope could not be encoded or decoded.
    #[error("json envelope error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload kind does not match what the serializer expects.
    #[error("expected {expected:?} payload, got {actual:?}")]
    UnexpectedPayloadKind {
        expected: PayloadKind,
        actual: PayloadKind,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors raised while splitting or reassembling chunked messages.
///
/// All of these are recoverable for the connection: the affected message is
/// dropped and traffic continues.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Chunk size must be at least one character.
    #[error("chunk size must be non-zero")]
    InvalidChunkSize,

    /// A chunk or end marker arrived for a message with no reassembly in progress.
    #[error("no reassembly in progress for message {0}")]
    UnknownMessage(String),

    /// A start marker arrived for a message that is already being reassembled.
    #[error("reassembly already in progress for message {0}")]
    DuplicateStart(String),

    /// The start marker's sizes are inconsistent with each other.
    #[error("inconsistent chunk start for message {msg_id}: {reason}")]
    InconsistentStart { msg_id: String, reason: String },

    /// The announced message is larger than the reassembly budget.
    #[error("chunked message too large ({size} chars, max {max})")]
    TooLarge { size: usize, max: usize },

    /// Too many reassemblies are already in progress.
    #[error("too many pending reassemblies (max {max})")]
    TooManyPending { max: usize },

    /// A chunk id is outside `0..chunk_count`.
    #[error("chunk {chunk_id} out of range for message {msg_id} ({chunk_count} chunks)")]
    ChunkOutOfRange {
        msg_id: String,
        chunk_id: usize,
        chunk_count: usize,
    },

    /// A chunk's offset or size disagrees with the announced layout.
    #[error("chunk {chunk_id} of message {msg_id} is misplaced: {reason}")]
    MisplacedChunk {
        msg_id: String,
        chunk_id: usize,
        reason: String,
    },

    /// The end marker arrived before every chunk.
    #[error("message {msg_id} incomplete ({received} of {expected} chunks)")]
    Incomplete {
        msg_id: String,
        received: usize,
        expected: usize,
    },

    /// A chunk control payload was not valid JSON.
    #[error("chunk control payload invalid: {0}")]
    Json(#[from] serde_json::Error),
}
