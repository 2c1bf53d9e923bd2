//! UTF-8 strings and string arrays.
//!
//! Two string modes exist:
//! - length-prefixed (`str`/`String`): `i32` byte length, then the bytes;
//! - raw ([`Raw`]): the bytes only, with the length carried out-of-band.
//!
//! String arrays encode a header of `count: i32` followed by `count` `i32`
//! byte lengths, then every string's bytes back to back.

use crate::error::{CodecError, Result};
use crate::wire::{WireDecode, WireEncode};

const LEN_SIZE: usize = 4;

fn put_len(len: usize, dst: &mut [u8]) {
    (len as i32).encode_into(&mut dst[..LEN_SIZE]);
}

fn read_len(src: &[u8]) -> Result<usize> {
    let (len, _) = i32::decode_from(src)?;
    usize::try_from(len).map_err(|_| CodecError::Malformed("negative length header"))
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| CodecError::Malformed("invalid utf-8"))
}

impl WireEncode for str {
    fn wire_len(&self) -> usize {
        LEN_SIZE + self.len()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        put_len(self.len(), dst);
        dst[LEN_SIZE..].copy_from_slice(self.as_bytes());
    }
}

impl WireEncode for String {
    fn wire_len(&self) -> usize {
        self.as_str().wire_len()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        self.as_str().encode_into(dst)
    }
}

impl WireDecode for String {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let len = read_len(src)?;
        let body = &src[LEN_SIZE..];
        if body.len() < len {
            return Err(CodecError::Short {
                needed: LEN_SIZE + len,
                available: src.len(),
            });
        }
        Ok((utf8(&body[..len])?, LEN_SIZE + len))
    }
}

/// A string written without a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw<'a>(pub &'a str);

impl WireEncode for Raw<'_> {
    fn wire_len(&self) -> usize {
        self.0.len()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        dst.copy_from_slice(self.0.as_bytes());
    }
}

/// Decode `len` raw UTF-8 bytes at `offset`.
pub fn deserialize_raw(buffer: Option<&[u8]>, offset: usize, len: usize) -> Result<(String, usize)> {
    let buf = buffer.ok_or(CodecError::Absent)?;
    let end = offset.checked_add(len).ok_or(CodecError::Malformed("length overflow"))?;
    let bytes = buf.get(offset..end).ok_or(CodecError::Short {
        needed: len,
        available: buf.len().saturating_sub(offset),
    })?;
    Ok((utf8(bytes)?, len))
}

impl<S: AsRef<str>> WireEncode for [S] {
    fn wire_len(&self) -> usize {
        LEN_SIZE
            + LEN_SIZE * self.len()
            + self.iter().map(|s| s.as_ref().len()).sum::<usize>()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        put_len(self.len(), dst);
        let mut header = LEN_SIZE;
        let mut body = LEN_SIZE + LEN_SIZE * self.len();
        for item in self {
            let bytes = item.as_ref().as_bytes();
            put_len(bytes.len(), &mut dst[header..]);
            dst[body..body + bytes.len()].copy_from_slice(bytes);
            header += LEN_SIZE;
            body += bytes.len();
        }
    }
}

impl<S: AsRef<str>> WireEncode for Vec<S> {
    fn wire_len(&self) -> usize {
        self.as_slice().wire_len()
    }

    fn encode_into(&self, dst: &mut [u8]) {
        self.as_slice().encode_into(dst)
    }
}

impl WireDecode for Vec<String> {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let count = read_len(src)?;
        let header_len = count
            .checked_mul(LEN_SIZE)
            .and_then(|n| n.checked_add(LEN_SIZE))
            .ok_or(CodecError::Malformed("string array count overflow"))?;
        if src.len() < header_len {
            return Err(CodecError::Short {
                needed: header_len,
                available: src.len(),
            });
        }

        let mut lengths = Vec::with_capacity(count);
        let mut total = header_len;
        for i in 0..count {
            let len = read_len(&src[LEN_SIZE * (i + 1)..])?;
            total = total
                .checked_add(len)
                .ok_or(CodecError::Malformed("string array length overflow"))?;
            lengths.push(len);
        }
        if src.len() < total {
            return Err(CodecError::Short {
                needed: total,
                available: src.len(),
            });
        }

        let mut items = Vec::with_capacity(count);
        let mut pos = header_len;
        for len in lengths {
            items.push(utf8(&src[pos..pos + len])?);
            pos += len;
        }
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{deserialize, serialize, to_vec, Encoded};

    #[test]
    fn length_prefixed_layout() {
        assert_eq!(to_vec("ab"), vec![2, 0, 0, 0, b'a', b'b']);
        assert_eq!(to_vec(""), vec![0, 0, 0, 0]);
    }

    #[test]
    fn multibyte_length_counts_bytes() {
        let text = "\u{00e9}\u{1f600}";
        let bytes = to_vec(text);
        assert_eq!(bytes[0] as usize, text.len());
        let (decoded, used) = deserialize::<String>(Some(&bytes), 0).unwrap();
        assert_eq!(decoded, text);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn raw_mode_has_no_prefix() {
        let bytes = to_vec(&Raw("xyz"));
        assert_eq!(bytes, b"xyz".to_vec());
        let (decoded, used) = deserialize_raw(Some(&bytes), 0, 3).unwrap();
        assert_eq!(decoded, "xyz");
        assert_eq!(used, 3);
    }

    #[test]
    fn raw_decode_failures() {
        assert_eq!(deserialize_raw(None, 0, 1).unwrap_err().code(), -1);
        assert_eq!(deserialize_raw(Some(b"ab"), 1, 4).unwrap_err().code(), -2);
        assert_eq!(deserialize_raw(Some(&[0xff, 0xfe]), 0, 2).unwrap_err().code(), -3);
    }

    #[test]
    fn negative_length_is_malformed() {
        let bytes = to_vec(&-5i32);
        let err = deserialize::<String>(Some(&bytes), 0).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn truncated_string_is_short() {
        let mut bytes = to_vec("hello");
        bytes.truncate(6);
        let err = deserialize::<String>(Some(&bytes), 0).unwrap_err();
        assert!(matches!(err, CodecError::Short { needed: 9, available: 6 }));
    }

    #[test]
    fn empty_array_is_four_zero_bytes() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(to_vec(&empty), vec![0, 0, 0, 0]);
        let (decoded, used) = deserialize::<Vec<String>>(Some(&[0, 0, 0, 0]), 0).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(used, 4);
    }

    #[test]
    fn array_layout_is_header_then_bodies() {
        let items = vec!["a", "", "bc"];
        let bytes = to_vec(&items);
        let mut expected = vec![3, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0];
        expected.extend_from_slice(b"abc");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn array_roundtrip_at_offset() {
        let items = vec!["first".to_string(), String::new(), "d\u{00e9}j\u{00e0}".to_string()];
        let mut buf = None;
        let written = serialize(&items, &mut buf, 3).written().unwrap();
        let buf = buf.unwrap();
        let (decoded, used) = deserialize::<Vec<String>>(Some(&buf), 3).unwrap();
        assert_eq!(decoded, items);
        assert_eq!(used, written);
    }

    #[test]
    fn array_probe_reports_exact_shortfall() {
        let items = vec!["abc", "de"];
        let needed = items.wire_len();
        let mut buf = Some(vec![0u8; needed - 3]);
        assert_eq!(serialize(&items, &mut buf, 0), Encoded::Shortfall(3));
        assert!(buf.unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn array_with_recorded_length_beyond_buffer_is_short() {
        let mut bytes = to_vec(&vec!["abcdef"]);
        bytes.truncate(bytes.len() - 2);
        let err = deserialize::<Vec<String>>(Some(&bytes), 0).unwrap_err();
        assert_eq!(err.code(), CodecError::SHORT);
    }

    #[test]
    fn array_with_truncated_header_is_short() {
        let bytes = to_vec(&3i32);
        let err = deserialize::<Vec<String>>(Some(&bytes), 0).unwrap_err();
        assert!(matches!(err, CodecError::Short { needed: 16, available: 4 }));
    }
}
