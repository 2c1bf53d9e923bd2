//! Reassembly of chunked messages.
//!
//! Chunks may arrive in any order and interleaved with unrelated messages.
//! Chunks are stored by id, so a retransmitted chunk replaces its own slot
//! without being counted twice.
//!
//! Memory grows only as chunk data arrives and is bounded three ways: a cap
//! on concurrent reassemblies, a byte cap per message, and eviction of
//! entries that see no activity within the configured timeout.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::channel::{CHUNK, CHUNK_END, CHUNK_START};
use crate::chunk::{chunk_count, Chunk, ChunkEnd, ChunkStart};
use crate::envelope::Envelope;
use crate::error::ChunkError;

/// Limits applied to in-progress reassemblies.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Inactivity window after which a partial message is evicted.
    pub timeout: Duration,
    /// Maximum number of concurrent reassemblies.
    pub max_pending: usize,
    /// Maximum message size in bytes of UTF-8 data.
    pub max_message_size: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_pending: 64,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
struct Reassembly {
    start: ChunkStart,
    header: Envelope,
    chunks: BTreeMap<usize, String>,
    buffered_bytes: usize,
    last_activity: Instant,
}

impl Reassembly {
    fn expected_len(&self, chunk_id: usize) -> usize {
        let offset = chunk_id * self.start.chunk_size;
        self.start
            .chunk_size
            .min(self.start.message_size.saturating_sub(offset))
    }

    fn is_complete(&self) -> bool {
        self.chunks.len() == self.start.chunk_count
    }
}

/// Collects chunk control messages and yields reassembled envelopes.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    pending: HashMap<String, Reassembly>,
    config: AssemblerConfig,
}

impl ChunkAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            pending: HashMap::new(),
            config,
        }
    }

    /// Route one chunk control envelope.
    ///
    /// Returns the reassembled envelope when `envelope` is a `ChunkEnd` that
    /// completes its message, `None` while a message is still in progress.
    pub fn handle(
        &mut self,
        envelope: &Envelope,
        now: Instant,
    ) -> Result<Option<Envelope>, ChunkError> {
        match envelope.message_type.as_str() {
            CHUNK_START => {
                let start: ChunkStart = serde_json::from_str(&envelope.data)?;
                self.begin(envelope, start, now)?;
                Ok(None)
            }
            CHUNK => {
                let chunk: Chunk = serde_json::from_str(&envelope.data)?;
                self.accept(chunk, now)?;
                Ok(None)
            }
            CHUNK_END => {
                let end: ChunkEnd = serde_json::from_str(&envelope.data)?;
                self.finish(&end).map(Some)
            }
            other => Err(ChunkError::InconsistentStart {
                msg_id: envelope.msg_id.clone(),
                reason: format!("'{other}' is not a chunk control message"),
            }),
        }
    }

    /// Open a reassembly buffer for an announced message.
    pub fn begin(
        &mut self,
        header: &Envelope,
        start: ChunkStart,
        now: Instant,
    ) -> Result<(), ChunkError> {
        if self.pending.contains_key(&start.msg_id) {
            return Err(ChunkError::DuplicateStart(start.msg_id));
        }
        if start.chunk_size == 0 {
            return Err(ChunkError::InconsistentStart {
                msg_id: start.msg_id,
                reason: "chunk size is zero".to_string(),
            });
        }
        if start.chunk_count != chunk_count(start.message_size, start.chunk_size) {
            return Err(ChunkError::InconsistentStart {
                reason: format!(
                    "{} chunks cannot carry {} chars at {} per chunk",
                    start.chunk_count, start.message_size, start.chunk_size
                ),
                msg_id: start.msg_id,
            });
        }
        if start.message_size > self.config.max_message_size {
            return Err(ChunkError::TooLarge {
                size: start.message_size,
                max: self.config.max_message_size,
            });
        }
        if self.pending.len() >= self.config.max_pending {
            return Err(ChunkError::TooManyPending {
                max: self.config.max_pending,
            });
        }

        debug!(
            msg_id = %start.msg_id,
            message_size = start.message_size,
            chunk_count = start.chunk_count,
            "chunked message started"
        );
        let header = Envelope {
            msg_id: start.msg_id.clone(),
            sent_time: start.sent_time,
            message_type: start.message_type.clone(),
            data: String::new(),
            ..header.clone()
        };
        self.pending.insert(
            start.msg_id.clone(),
            Reassembly {
                chunks: BTreeMap::new(),
                buffered_bytes: 0,
                header,
                start,
                last_activity: now,
            },
        );
        Ok(())
    }

    /// Write one chunk into its message's buffer.
    pub fn accept(&mut self, chunk: Chunk, now: Instant) -> Result<(), ChunkError> {
        let entry = self
            .pending
            .get_mut(&chunk.msg_id)
            .ok_or_else(|| ChunkError::UnknownMessage(chunk.msg_id.clone()))?;

        if chunk.chunk_id >= entry.start.chunk_count {
            return Err(ChunkError::ChunkOutOfRange {
                chunk_count: entry.start.chunk_count,
                chunk_id: chunk.chunk_id,
                msg_id: chunk.msg_id,
            });
        }

        let expected_offset = chunk.chunk_id * entry.start.chunk_size;
        if chunk.offset != expected_offset {
            return Err(ChunkError::MisplacedChunk {
                reason: format!("offset {} (expected {expected_offset})", chunk.offset),
                chunk_id: chunk.chunk_id,
                msg_id: chunk.msg_id,
            });
        }

        let expected_len = entry.expected_len(chunk.chunk_id);
        let actual_len = chunk.data.chars().count();
        if actual_len != expected_len || chunk.chunk_size != expected_len {
            return Err(ChunkError::MisplacedChunk {
                reason: format!(
                    "{actual_len} chars, declared {} (expected {expected_len})",
                    chunk.chunk_size
                ),
                chunk_id: chunk.chunk_id,
                msg_id: chunk.msg_id,
            });
        }

        let replaced = entry.chunks.get(&chunk.chunk_id).map_or(0, String::len);
        let buffered = entry.buffered_bytes - replaced + chunk.data.len();
        if buffered > self.config.max_message_size {
            let msg_id = chunk.msg_id;
            self.pending.remove(&msg_id);
            warn!(%msg_id, buffered, "chunked message exceeds byte limit");
            return Err(ChunkError::TooLarge {
                size: buffered,
                max: self.config.max_message_size,
            });
        }
        entry.buffered_bytes = buffered;
        entry.last_activity = now;
        if entry.chunks.insert(chunk.chunk_id, chunk.data).is_some() {
            debug!(msg_id = %chunk.msg_id, chunk_id = chunk.chunk_id, "duplicate chunk overwritten");
        }
        Ok(())
    }

    /// Close a message, yielding it if every chunk arrived.
    ///
    /// The buffer is released either way.
    pub fn finish(&mut self, end: &ChunkEnd) -> Result<Envelope, ChunkError> {
        let entry = self
            .pending
            .remove(&end.msg_id)
            .ok_or_else(|| ChunkError::UnknownMessage(end.msg_id.clone()))?;

        if !entry.is_complete() {
            warn!(
                msg_id = %end.msg_id,
                received = entry.chunks.len(),
                expected = entry.start.chunk_count,
                "discarding incomplete chunked message"
            );
            return Err(ChunkError::Incomplete {
                msg_id: end.msg_id.clone(),
                received: entry.chunks.len(),
                expected: entry.start.chunk_count,
            });
        }

        Ok(Envelope {
            data: entry.chunks.into_values().collect(),
            ..entry.header
        })
    }

    /// Drop reassemblies idle for longer than the timeout, returning their ids.
    pub fn evict_expired(&mut self, now: Instant) -> Vec<String> {
        let timeout = self.config.timeout;
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.last_activity) > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.pending.remove(id);
            warn!(msg_id = %id, "evicted orphaned chunked message");
        }
        expired
    }

    /// Number of reassemblies in progress.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop every reassembly in progress.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
