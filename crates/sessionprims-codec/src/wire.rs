use crate::error::{CodecError, Result};

/// A value with a deterministic little-endian wire encoding.
pub trait WireEncode {
    /// Number of bytes [`WireEncode::encode_into`] writes.
    fn wire_len(&self) -> usize;

    /// Write the encoding into `dst`, which is exactly `wire_len()` bytes long.
    fn encode_into(&self, dst: &mut [u8]);
}

/// A value that can be read back from its wire encoding.
pub trait WireDecode: Sized {
    /// Decode from the start of `src`, returning the value and bytes consumed.
    fn decode_from(src: &[u8]) -> Result<(Self, usize)>;
}

/// Values whose encoding always has the same size.
pub trait FixedWidth {
    /// Encoded size in bytes.
    const WIRE_SIZE: usize;
}

impl<T: WireEncode + ?Sized> WireEncode for &T {
    fn wire_len(&self) -> usize {
        (**self).wire_len()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        (**self).encode_into(dst)
    }
}

/// Outcome of a serialize call.
///
/// A `Shortfall` is a probe result rather than a failure: the buffer was left
/// untouched and needs `k` more bytes past the given offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    /// `n` bytes were written.
    Written(usize),
    /// Nothing was written; `k` additional bytes are required.
    Shortfall(usize),
}

impl Encoded {
    /// Signed form: bytes written, or the negated shortfall.
    pub fn code(self) -> i64 {
        match self {
            Encoded::Written(n) => n as i64,
            Encoded::Shortfall(k) => -(k as i64),
        }
    }

    /// Bytes written, if the call succeeded.
    pub fn written(self) -> Option<usize> {
        match self {
            Encoded::Written(n) => Some(n),
            Encoded::Shortfall(_) => None,
        }
    }
}

/// Serialize `value` at `offset`, allocating the buffer when it is absent.
///
/// An absent buffer is created with room for `offset + wire_len` bytes. An
/// existing buffer is never grown: if it lacks capacity the call reports the
/// shortfall and leaves it unchanged.
pub fn serialize<T: WireEncode + ?Sized>(
    value: &T,
    buffer: &mut Option<Vec<u8>>,
    offset: usize,
) -> Encoded {
    match buffer {
        Some(buf) => serialize_into(value, buf.as_mut_slice(), offset),
        None => {
            let needed = value.wire_len();
            let mut buf = vec![0u8; offset + needed];
            value.encode_into(&mut buf[offset..]);
            *buffer = Some(buf);
            Encoded::Written(needed)
        }
    }
}

/// Serialize `value` into a fixed slice at `offset`.
pub fn serialize_into<T: WireEncode + ?Sized>(value: &T, dst: &mut [u8], offset: usize) -> Encoded {
    let needed = value.wire_len();
    let available = dst.len().saturating_sub(offset);
    if available < needed {
        return Encoded::Shortfall(needed - available);
    }
    value.encode_into(&mut dst[offset..offset + needed]);
    Encoded::Written(needed)
}

/// Deserialize a value at `offset`, returning it with the bytes consumed.
pub fn deserialize<T: WireDecode>(buffer: Option<&[u8]>, offset: usize) -> Result<(T, usize)> {
    let buf = buffer.ok_or(CodecError::Absent)?;
    let src = buf.get(offset..).ok_or(CodecError::Short {
        needed: offset,
        available: buf.len(),
    })?;
    T::decode_from(src)
}

/// Encode a value into a fresh, exactly sized vector.
pub fn to_vec<T: WireEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut buf = vec![0u8; value.wire_len()];
    value.encode_into(&mut buf);
    buf
}

/// Borrow the first `N` bytes of `src` as an array.
pub(crate) fn take<const N: usize>(src: &[u8]) -> Result<[u8; N]> {
    src.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(CodecError::Short {
            needed: N,
            available: src.len(),
        })
}

/// Appends values to a growing buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append one value.
    pub fn put<T: WireEncode + ?Sized>(&mut self, value: &T) -> &mut Self {
        let start = self.buf.len();
        self.buf.resize(start + value.wire_len(), 0);
        value.encode_into(&mut self.buf[start..]);
        self
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads consecutive values from a borrowed buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read the next value and advance past it.
    pub fn read<T: WireDecode>(&mut self) -> Result<T> {
        let (value, consumed) = deserialize::<T>(Some(self.buf), self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_allocates_absent_buffer() {
        let mut buf = None;
        let outcome = serialize(&0x0102_0304i32, &mut buf, 2);
        assert_eq!(outcome, Encoded::Written(4));
        assert_eq!(buf.unwrap(), vec![0, 0, 4, 3, 2, 1]);
    }

    #[test]
    fn serialize_reports_shortfall_without_writing() {
        let mut buf = Some(vec![0xAA; 6]);
        let outcome = serialize(&7i64, &mut buf, 2);
        assert_eq!(outcome, Encoded::Shortfall(4));
        assert_eq!(outcome.code(), -4);
        assert_eq!(buf.unwrap(), vec![0xAA; 6]);
    }

    #[test]
    fn serialize_with_offset_past_end_reports_full_size() {
        let mut buf = Some(vec![0u8; 2]);
        assert_eq!(serialize(&1i32, &mut buf, 10), Encoded::Shortfall(4));
    }

    #[test]
    fn serialize_into_existing_buffer_keeps_length() {
        let mut buf = Some(vec![0u8; 8]);
        assert_eq!(serialize(&-1i32, &mut buf, 4), Encoded::Written(4));
        assert_eq!(buf.unwrap(), vec![0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn deserialize_absent_buffer() {
        let err = deserialize::<i32>(None, 0).unwrap_err();
        assert_eq!(err, CodecError::Absent);
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn deserialize_short_buffer() {
        let bytes = [1u8, 2, 3, 4];
        let err = deserialize::<i32>(Some(&bytes), 1).unwrap_err();
        assert!(matches!(err, CodecError::Short { needed: 4, available: 3 }));
        assert_eq!(err.code(), -2);
    }

    #[test]
    fn deserialize_offset_beyond_buffer() {
        let bytes = [1u8, 2];
        let err = deserialize::<bool>(Some(&bytes), 5).unwrap_err();
        assert_eq!(err.code(), CodecError::SHORT);
    }

    #[test]
    fn writer_and_reader_compose() {
        let mut writer = WireWriter::default();
        writer.put(&true).put(&-12i16).put("hello").put(&3.25f64);
        let bytes = writer.into_inner();

        let mut reader = WireReader::new(&bytes);
        assert!(reader.read::<bool>().unwrap());
        assert_eq!(reader.read::<i16>().unwrap(), -12);
        assert_eq!(reader.read::<String>().unwrap(), "hello");
        assert_eq!(reader.read::<f64>().unwrap(), 3.25);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.position(), bytes.len());
    }

    #[test]
    fn to_vec_matches_wire_len() {
        let value = "multi-byte: \u{00e9}\u{4e2d}";
        assert_eq!(to_vec(value).len(), value.wire_len());
    }
}
