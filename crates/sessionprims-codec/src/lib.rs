//! Deterministic little-endian binary codec.
//!
//! This is the lowest layer of sessionprims. Every value is written at an
//! explicit offset into a byte buffer, with a probing convention: a serialize
//! call against a buffer that is too small writes nothing and reports how many
//! more bytes it needs. Decoding reports absent, short and malformed buffers as
//! [`CodecError`] values with stable negative codes.
//!
//! Wire byte order is little-endian regardless of host architecture.

pub mod endian;
pub mod error;
pub mod primitive;
pub mod string;
pub mod value;
pub mod wire;

#[cfg(test)]
mod proptests;

pub use endian::{canonicalize, Endian};
pub use error::{CodecError, Result};
pub use string::{deserialize_raw, Raw};
pub use value::{Ticks, Version, TICKS_PER_SECOND, UNIX_EPOCH_TICKS};
pub use wire::{
    deserialize, serialize, serialize_into, to_vec, Encoded, FixedWidth, WireDecode, WireEncode,
    WireReader, WireWriter,
};
