use std::time::Instant;

use bytes::BytesMut;
use proptest::prelude::*;

use crate::assembler::ChunkAssembler;
use crate::chunk::ChunkPlan;
use crate::codec::{decode_frame, encode_frame, DEFAULT_MAX_PAYLOAD};
use crate::envelope::Envelope;
use crate::serializer::{BinarySerializer, EnvelopeSerializer, JsonSerializer};

fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    (
        "[A-Za-z.]{1,16}",
        "\\PC{0,64}",
        "[a-z]{0,8}",
        "[a-z]{0,8}",
        prop::collection::vec("\\PC{0,8}", 0..4),
        any::<i64>(),
    )
        .prop_map(|(message_type, data, channel, scope, props, ticks)| {
            let mut env = Envelope::new(message_type, data)
                .on_channel(channel)
                .with_scope(scope)
                .with_props(props);
            env.sent_time = sessionprims_codec::Ticks(ticks);
            env
        })
}

proptest! {
    #[test]
    fn shuffled_chunks_reassemble(
        (data, order) in "\\PC{1,300}".prop_flat_map(|data| {
            let chars = data.chars().count();
            (Just(data), 1usize..=chars.max(1))
        }).prop_flat_map(|(data, chunk_size)| {
            let count = data.chars().count().div_ceil(chunk_size);
            (Just((data, chunk_size)), Just((0..count).collect::<Vec<_>>()).prop_shuffle())
        })
    ) {
        let (data, chunk_size) = data;
        let env = Envelope::new("Shuffled", data).on_channel("bulk");
        let plan = ChunkPlan::split(&env, chunk_size).unwrap();
        let now = Instant::now();
        let mut assembler = ChunkAssembler::default();

        assembler.begin(&env, plan.start.clone(), now).unwrap();
        for idx in order {
            assembler.accept(plan.chunks[idx].clone(), now).unwrap();
        }
        prop_assert_eq!(assembler.finish(&plan.end).unwrap(), env);
    }

    #[test]
    fn serializers_roundtrip(env in envelope_strategy()) {
        let json = JsonSerializer.encode(&env).unwrap();
        prop_assert_eq!(JsonSerializer.decode(&json).unwrap(), env.clone());
        let binary = BinarySerializer.encode(&env).unwrap();
        prop_assert_eq!(BinarySerializer.decode(&binary).unwrap(), env);
    }

    #[test]
    fn frames_survive_arbitrary_splits(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8),
        cut in 0usize..512,
    ) {
        let mut wire = BytesMut::new();
        for payload in &payloads {
            encode_frame(payload, &mut wire).unwrap();
        }
        let cut = cut.min(wire.len());
        let tail = wire.split_off(cut);
        let mut buf = wire;

        let mut decoded = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap() {
            decoded.push(frame.to_vec());
        }
        buf.extend_from_slice(&tail);
        while let Some(frame) = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap() {
            decoded.push(frame.to_vec());
        }
        prop_assert_eq!(decoded, payloads);
        prop_assert!(buf.is_empty());
    }
}
