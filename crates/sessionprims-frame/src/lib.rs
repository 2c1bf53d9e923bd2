//! Envelopes, framing and chunking for sessionprims.
//!
//! This layer sits between the binary codec and the transports:
//! - [`Envelope`] is the wire message record, serialized as JSON text or
//!   binary via an [`EnvelopeSerializer`]
//! - [`LengthCodec`] frames payloads on byte streams with a 4-byte
//!   little-endian length prefix; an empty frame is a keepalive
//! - [`ChunkPlan`] and [`ChunkAssembler`] split and rebuild messages that
//!   exceed the configured chunk size
//!
//! Reserved channel and message type names live in [`channel`].

pub mod assembler;
pub mod channel;
pub mod chunk;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod serializer;

#[cfg(test)]
mod proptests;

pub use assembler::{AssemblerConfig, ChunkAssembler};
pub use chunk::{chunk_count, Chunk, ChunkEnd, ChunkPlan, ChunkStart};
pub use codec::{decode_frame, encode_frame, LengthCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use envelope::{new_msg_id, Envelope, PayloadKind};
pub use error::{ChunkError, FrameError, Result};
pub use serializer::{BinarySerializer, EnvelopeSerializer, JsonSerializer};
