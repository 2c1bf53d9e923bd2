use serde::{Deserialize, Serialize};
use sessionprims_codec::Ticks;
use uuid::Uuid;

/// Whether a serialized envelope is text or opaque bytes.
///
/// Message-oriented transports use this to pick a text or binary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Binary,
}

/// The wire message record.
///
/// `data` is an opaque payload (typically JSON produced by the application)
/// that this crate moves but never parses. All chunks of one logical message
/// share its `msg_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub msg_id: String,
    #[serde(rename = "SentTimeUTC", with = "ticks_serde")]
    pub sent_time: Ticks,
    pub message_type: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub reply_to: String,
    #[serde(default)]
    pub props: Vec<String>,
}

impl Envelope {
    /// Create an envelope with a fresh id, stamped with the current time.
    pub fn new(message_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            msg_id: new_msg_id(),
            sent_time: Ticks::now(),
            message_type: message_type.into(),
            data: data.into(),
            scope: String::new(),
            channel: String::new(),
            reply_to: String::new(),
            props: Vec::new(),
        }
    }

    /// Route the envelope to a channel.
    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Mark the envelope as a reply to another message id.
    pub fn in_reply_to(mut self, msg_id: impl Into<String>) -> Self {
        self.reply_to = msg_id.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Use a caller-chosen message id instead of a generated one.
    pub fn with_msg_id(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = msg_id.into();
        self
    }

    pub fn with_props(mut self, props: Vec<String>) -> Self {
        self.props = props;
        self
    }

    /// Length of `data` in characters, the unit chunking counts in.
    pub fn data_len(&self) -> usize {
        self.data.chars().count()
    }

    /// True if this envelope answers the message `msg_id`.
    pub fn is_reply_to(&self, msg_id: &str) -> bool {
        !self.reply_to.is_empty() && self.reply_to == msg_id
    }
}

/// Generate a new message id.
pub fn new_msg_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub(crate) mod ticks_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use sessionprims_codec::Ticks;

    pub fn serialize<S: Serializer>(ticks: &Ticks, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ticks.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ticks, D::Error> {
        i64::deserialize(deserializer).map(Ticks)
    }
}
