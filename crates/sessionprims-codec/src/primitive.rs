//! Fixed-width primitives.
//!
//! | Type     | Bytes |
//! |----------|-------|
//! | `bool`   | 1     |
//! | `i16`    | 2     |
//! | `i32`    | 4     |
//! | `i64`    | 8     |
//! | `f32`    | 4     |
//! | `f64`    | 8     |
//! | `Uuid`   | 16    |
//!
//! `i16` uses the tight two-byte form.

use uuid::Uuid;

use crate::endian::{canonicalize, Endian};
use crate::error::Result;
use crate::wire::{take, FixedWidth, WireDecode, WireEncode};

macro_rules! fixed_width_number {
    ($($ty:ty),* $(,)?) => {$(
        impl FixedWidth for $ty {
            const WIRE_SIZE: usize = std::mem::size_of::<$ty>();
        }

        impl WireEncode for $ty {
            fn wire_len(&self) -> usize {
                <$ty as FixedWidth>::WIRE_SIZE
            }

            fn encode_into(&self, dst: &mut [u8]) {
                dst.copy_from_slice(&canonicalize(self.to_ne_bytes(), Endian::NATIVE));
            }
        }

        impl WireDecode for $ty {
            fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
                let bytes = take::<{ std::mem::size_of::<$ty>() }>(src)?;
                let value = <$ty>::from_ne_bytes(canonicalize(bytes, Endian::NATIVE));
                Ok((value, <$ty as FixedWidth>::WIRE_SIZE))
            }
        }
    )*};
}

fixed_width_number!(i16, i32, i64, f32, f64);

impl FixedWidth for bool {
    const WIRE_SIZE: usize = 1;
}

impl WireEncode for bool {
    fn wire_len(&self) -> usize {
        Self::WIRE_SIZE
    }

    fn encode_into(&self, dst: &mut [u8]) {
        dst[0] = u8::from(*self);
    }
}

impl WireDecode for bool {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let [byte] = take::<1>(src)?;
        Ok((byte != 0, Self::WIRE_SIZE))
    }
}

impl FixedWidth for Uuid {
    const WIRE_SIZE: usize = 16;
}

/// UUIDs travel as their 16 RFC 4122 bytes, most significant first.
impl WireEncode for Uuid {
    fn wire_len(&self) -> usize {
        Self::WIRE_SIZE
    }

    fn encode_into(&self, dst: &mut [u8]) {
        dst.copy_from_slice(self.as_bytes());
    }
}

impl WireDecode for Uuid {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let bytes = take::<16>(src)?;
        Ok((Uuid::from_bytes(bytes), Self::WIRE_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{deserialize, serialize, to_vec, Encoded};

    #[test]
    fn wire_sizes() {
        assert_eq!(bool::WIRE_SIZE, 1);
        assert_eq!(i16::WIRE_SIZE, 2);
        assert_eq!(i32::WIRE_SIZE, 4);
        assert_eq!(i64::WIRE_SIZE, 8);
        assert_eq!(f32::WIRE_SIZE, 4);
        assert_eq!(f64::WIRE_SIZE, 8);
        assert_eq!(Uuid::WIRE_SIZE, 16);
    }

    #[test]
    fn integers_are_little_endian_on_the_wire() {
        assert_eq!(to_vec(&0x0102i16), vec![0x02, 0x01]);
        assert_eq!(to_vec(&0x0102_0304i32), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(to_vec(&1i64), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(to_vec(&1.0f32), 1.0f32.to_le_bytes().to_vec());
    }

    #[test]
    fn bool_roundtrip_and_lenient_truth() {
        assert_eq!(to_vec(&true), vec![1]);
        assert_eq!(to_vec(&false), vec![0]);
        let (value, used) = deserialize::<bool>(Some(&[7]), 0).unwrap();
        assert!(value);
        assert_eq!(used, 1);
    }

    #[test]
    fn short_probe_matches_shortfall() {
        let mut buf = Some(vec![0u8; 1]);
        assert_eq!(serialize(&5i16, &mut buf, 0), Encoded::Shortfall(1));
        let mut buf = Some(vec![0u8; 2]);
        assert_eq!(serialize(&5i16, &mut buf, 0), Encoded::Written(2));
    }

    #[test]
    fn uuid_roundtrip_keeps_byte_order() {
        let id = Uuid::from_bytes([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        let bytes = to_vec(&id);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[15], 0xff);
        let (decoded, used) = deserialize::<Uuid>(Some(&bytes), 0).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(used, 16);
    }

    #[test]
    fn float_specials_roundtrip() {
        for value in [0.0f64, -0.0, f64::INFINITY, f64::MIN_POSITIVE, f64::MAX] {
            let bytes = to_vec(&value);
            let (decoded, _) = deserialize::<f64>(Some(&bytes), 0).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits());
        }
        let bytes = to_vec(&f32::NAN);
        let (decoded, _) = deserialize::<f32>(Some(&bytes), 0).unwrap();
        assert!(decoded.is_nan());
    }
}
