use bytes::Bytes;
use sessionprims_codec::{CodecError, Ticks, WireReader, WireWriter};

use crate::envelope::{Envelope, PayloadKind};
use crate::error::{FrameError, Result};

/// Turns envelopes into transport payloads and back.
pub trait EnvelopeSerializer: Send + Sync + 'static {
    /// The kind of payload this serializer produces and accepts.
    fn kind(&self) -> PayloadKind;

    /// Encode an envelope.
    fn encode(&self, envelope: &Envelope) -> Result<Bytes>;

    /// Decode an envelope.
    fn decode(&self, payload: &[u8]) -> Result<Envelope>;
}

/// JSON text envelopes with PascalCase field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl EnvelopeSerializer for JsonSerializer {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Text
    }

    fn encode(&self, envelope: &Envelope) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(envelope)?))
    }

    fn decode(&self, payload: &[u8]) -> Result<Envelope> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Binary envelopes built from the wire codec.
///
/// Layout, in order: `MsgId`, `SentTimeUTC` (ticks), `MessageType`, `Data`,
/// `Scope`, `Channel`, `ReplyTo` as length-prefixed strings (except the
/// ticks), then `Props` as a string array.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl EnvelopeSerializer for BinarySerializer {
    fn kind(&self) -> PayloadKind {
        PayloadKind::Binary
    }

    fn encode(&self, envelope: &Envelope) -> Result<Bytes> {
        let mut writer = WireWriter::with_capacity(64 + envelope.data.len());
        writer
            .put(envelope.msg_id.as_str())
            .put(&envelope.sent_time)
            .put(envelope.message_type.as_str())
            .put(envelope.data.as_str())
            .put(envelope.scope.as_str())
            .put(envelope.channel.as_str())
            .put(envelope.reply_to.as_str())
            .put(&envelope.props);
        Ok(Bytes::from(writer.into_inner()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Envelope> {
        let mut reader = WireReader::new(payload);
        let envelope = Envelope {
            msg_id: reader.read()?,
            sent_time: reader.read::<Ticks>()?,
            message_type: reader.read()?,
            data: reader.read()?,
            scope: reader.read()?,
            channel: reader.read()?,
            reply_to: reader.read()?,
            props: reader.read()?,
        };
        if reader.remaining() != 0 {
            return Err(FrameError::Codec(CodecError::Malformed(
                "trailing bytes after envelope",
            )));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope::new("Order.Created", "{\"id\":42,\"name\":\"caf\u{00e9}\"}")
            .on_channel("orders")
            .with_scope("tenant-7")
            .in_reply_to("req-1")
            .with_props(vec!["a".to_string(), String::new(), "z=1".to_string()])
    }

    #[test]
    fn json_roundtrip() {
        let env = sample();
        let bytes = JsonSerializer.encode(&env).unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
        assert_eq!(JsonSerializer.decode(&bytes).unwrap(), env);
        assert_eq!(JsonSerializer.kind(), PayloadKind::Text);
    }

    #[test]
    fn json_accepts_missing_optional_fields() {
        let env = JsonSerializer
            .decode(br#"{"MsgId":"m","SentTimeUTC":5,"MessageType":"T"}"#)
            .unwrap();
        assert_eq!(env.msg_id, "m");
        assert_eq!(env.sent_time, Ticks(5));
        assert!(env.data.is_empty());
        assert!(env.props.is_empty());
    }

    #[test]
    fn json_rejects_garbage() {
        let err = JsonSerializer.decode(b"{not-json").unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
    }

    #[test]
    fn binary_roundtrip() {
        let env = sample();
        let bytes = BinarySerializer.encode(&env).unwrap();
        assert_eq!(BinarySerializer.decode(&bytes).unwrap(), env);
        assert_eq!(BinarySerializer.kind(), PayloadKind::Binary);
    }

    #[test]
    fn binary_rejects_truncation_and_trailing_bytes() {
        let bytes = BinarySerializer.encode(&sample()).unwrap();
        let err = BinarySerializer.decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, FrameError::Codec(CodecError::Short { .. })));

        let mut padded = bytes.to_vec();
        padded.push(0);
        let err = BinarySerializer.decode(&padded).unwrap_err();
        assert!(matches!(err, FrameError::Codec(CodecError::Malformed(_))));
    }
}
