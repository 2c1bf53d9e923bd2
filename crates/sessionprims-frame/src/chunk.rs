//! Splitting oversized envelopes into chunk control messages.
//!
//! A chunked message travels as one `ChunkStart`, `ChunkCount` `Chunk`s and one
//! `ChunkEnd`, all sharing the original `MsgId`. Sizes and offsets count the
//! characters of `Data`, so every slice is itself valid text.
//!
//! The control envelopes keep the original channel, scope, reply-to and props
//! in their own header fields; only `MessageType` and `Data` change.

use serde::{Deserialize, Serialize};
use sessionprims_codec::Ticks;

use crate::channel::{CHUNK, CHUNK_END, CHUNK_START};
use crate::envelope::{ticks_serde, Envelope};
use crate::error::ChunkError;

/// Announces a chunked message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChunkStart {
    pub msg_id: String,
    #[serde(rename = "SentTimeUTC", with = "ticks_serde")]
    pub sent_time: Ticks,
    pub message_type: String,
    pub message_size: usize,
    pub chunk_size: usize,
    pub chunk_count: usize,
}

/// One slice of a chunked message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Chunk {
    pub msg_id: String,
    pub chunk_id: usize,
    pub offset: usize,
    pub chunk_size: usize,
    pub data: String,
}

/// Marks completion of a chunked message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChunkEnd {
    pub msg_id: String,
}

/// Number of chunks needed for `message_size` characters.
pub fn chunk_count(message_size: usize, chunk_size: usize) -> usize {
    message_size.div_ceil(chunk_size)
}

/// The full chunk sequence for one envelope.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub start: ChunkStart,
    pub chunks: Vec<Chunk>,
    pub end: ChunkEnd,
    header: Envelope,
}

impl ChunkPlan {
    /// Split `envelope.data` into slices of at most `chunk_size` characters.
    pub fn split(envelope: &Envelope, chunk_size: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize);
        }

        let mut chunks = Vec::new();
        let mut message_size = 0;
        let mut rest = envelope.data.as_str();
        while !rest.is_empty() {
            let cut = rest
                .char_indices()
                .nth(chunk_size)
                .map_or(rest.len(), |(idx, _)| idx);
            let (slice, tail) = rest.split_at(cut);
            let slice_len = slice.chars().count();
            let chunk_id = chunks.len();
            chunks.push(Chunk {
                msg_id: envelope.msg_id.clone(),
                chunk_id,
                offset: chunk_id * chunk_size,
                chunk_size: slice_len,
                data: slice.to_owned(),
            });
            message_size += slice_len;
            rest = tail;
        }

        let header = Envelope {
            data: String::new(),
            ..envelope.clone()
        };

        Ok(Self {
            start: ChunkStart {
                msg_id: envelope.msg_id.clone(),
                sent_time: envelope.sent_time,
                message_type: envelope.message_type.clone(),
                message_size,
                chunk_size,
                chunk_count: chunks.len(),
            },
            chunks,
            end: ChunkEnd {
                msg_id: envelope.msg_id.clone(),
            },
            header,
        })
    }

    /// Total number of wire messages this plan produces.
    pub fn wire_count(&self) -> usize {
        self.chunks.len() + 2
    }

    /// Render the plan as control envelopes, in send order.
    pub fn into_envelopes(self) -> Result<Vec<Envelope>, ChunkError> {
        let mut out = Vec::with_capacity(self.wire_count());
        out.push(self.control(CHUNK_START, serde_json::to_string(&self.start)?));
        for chunk in &self.chunks {
            out.push(self.control(CHUNK, serde_json::to_string(chunk)?));
        }
        out.push(self.control(CHUNK_END, serde_json::to_string(&self.end)?));
        Ok(out)
    }

    fn control(&self, message_type: &str, data: String) -> Envelope {
        Envelope {
            message_type: message_type.to_string(),
            data,
            ..self.header.clone()
        }
    }
}
