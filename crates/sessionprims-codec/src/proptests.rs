use proptest::prelude::*;
use uuid::Uuid;

use crate::wire::{deserialize, serialize, to_vec, Encoded, WireDecode, WireEncode};
use crate::{Ticks, Version};

fn roundtrip<T>(value: &T) -> (T, usize, usize)
where
    T: WireEncode + WireDecode,
{
    let mut buf = None;
    let written = serialize(value, &mut buf, 0)
        .written()
        .expect("absent buffer always fits");
    let buf = buf.expect("buffer allocated");
    let (decoded, used) = deserialize::<T>(Some(&buf), 0).expect("decode succeeds");
    (decoded, written, used)
}

proptest! {
    #[test]
    fn integers_roundtrip(a: i16, b: i32, c: i64) {
        let (da, wa, ua) = roundtrip(&a);
        let (db, wb, ub) = roundtrip(&b);
        let (dc, wc, uc) = roundtrip(&c);
        prop_assert_eq!((da, db, dc), (a, b, c));
        prop_assert_eq!((wa, wb, wc), (ua, ub, uc));
    }

    #[test]
    fn floats_roundtrip_bitwise(a: f32, b: f64) {
        let (da, _, _) = roundtrip(&a);
        let (db, _, _) = roundtrip(&b);
        prop_assert_eq!(da.to_bits(), a.to_bits());
        prop_assert_eq!(db.to_bits(), b.to_bits());
    }

    #[test]
    fn composite_values_roundtrip(bytes: [u8; 16], ticks: i64, parts: [i32; 4], flag: bool) {
        let id = Uuid::from_bytes(bytes);
        let version = Version::new(parts[0], parts[1], parts[2], parts[3]);
        prop_assert_eq!(roundtrip(&id).0, id);
        prop_assert_eq!(roundtrip(&Ticks(ticks)).0, Ticks(ticks));
        prop_assert_eq!(roundtrip(&version).0, version);
        prop_assert_eq!(roundtrip(&flag).0, flag);
    }

    #[test]
    fn strings_roundtrip(text in "\\PC*") {
        let (decoded, written, used) = roundtrip(&text);
        prop_assert_eq!(decoded, text);
        prop_assert_eq!(written, used);
    }

    #[test]
    fn string_arrays_roundtrip(items in prop::collection::vec("\\PC{0,12}", 0..16)) {
        let (decoded, written, used) = roundtrip(&items);
        prop_assert_eq!(decoded, items);
        prop_assert_eq!(written, used);
    }

    #[test]
    fn probe_reports_exact_shortfall(text in "\\PC{0,24}", missing in 1usize..8, offset in 0usize..4) {
        let needed = text.wire_len();
        let missing = missing.min(needed);
        let len = offset + needed - missing;
        let mut buf = Some(vec![0x5A; len]);
        prop_assert_eq!(serialize(&text, &mut buf, offset), Encoded::Shortfall(missing));
        prop_assert!(buf.expect("buffer kept").iter().all(|b| *b == 0x5A));
    }

    #[test]
    fn decode_never_reads_past_truncation(items in prop::collection::vec("[a-z]{1,6}", 1..6), cut in 1usize..6) {
        let bytes = to_vec(&items);
        let cut = cut.min(bytes.len());
        let truncated = &bytes[..bytes.len() - cut];
        prop_assert!(deserialize::<Vec<String>>(Some(truncated), 0).is_err());
    }
}
