use serde::{Deserialize, Serialize};
use sessionprims_frame::channel::{CLOSE, CONTROL, REGISTER, REGISTER_REPLY};
use sessionprims_frame::Envelope;

use crate::error::Result;
use crate::registration::{ConnRegisterDTO, ConnRegisterReplyDTO};

/// Graceful close request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CloseDTO {
    #[serde(default)]
    pub reason: String,
}

/// Connection management message carried on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Register(ConnRegisterDTO),
    RegisterReply(ConnRegisterReplyDTO),
    Close(CloseDTO),
}

impl ControlMessage {
    pub fn close(reason: impl Into<String>) -> Self {
        Self::Close(CloseDTO {
            reason: reason.into(),
        })
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Register(_) => REGISTER,
            Self::RegisterReply(_) => REGISTER_REPLY,
            Self::Close(_) => CLOSE,
        }
    }

    /// Parse a control envelope. Unknown message types yield `None`.
    pub fn parse(envelope: &Envelope) -> Result<Option<Self>> {
        let message = match envelope.message_type.as_str() {
            REGISTER => Self::Register(serde_json::from_str(&envelope.data)?),
            REGISTER_REPLY => Self::RegisterReply(serde_json::from_str(&envelope.data)?),
            CLOSE => Self::Close(serde_json::from_str(&envelope.data)?),
            _ => return Ok(None),
        };
        Ok(Some(message))
    }

    pub fn to_envelope(&self) -> Result<Envelope> {
        let data = match self {
            Self::Register(dto) => serde_json::to_string(dto)?,
            Self::RegisterReply(dto) => serde_json::to_string(dto)?,
            Self::Close(dto) => serde_json::to_string(dto)?,
        };
        Ok(Envelope::new(self.message_type(), data).on_channel(CONTROL))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn close_roundtrip() {
        let envelope = ControlMessage::close("bye").to_envelope().unwrap();
        assert_eq!(envelope.channel, CONTROL);
        assert_eq!(envelope.message_type, CLOSE);
        assert_eq!(
            ControlMessage::parse(&envelope).unwrap(),
            Some(ControlMessage::close("bye"))
        );
    }

    #[test]
    fn register_roundtrip() {
        let dto = ConnRegisterDTO {
            connection_id: "c1".to_string(),
            user_id: Uuid::nil(),
            device_id: "d".to_string(),
            props: vec!["p".to_string()],
        };
        let envelope = ControlMessage::Register(dto.clone()).to_envelope().unwrap();
        assert_eq!(envelope.message_type, REGISTER);
        assert_eq!(
            ControlMessage::parse(&envelope).unwrap(),
            Some(ControlMessage::Register(dto))
        );
    }

    #[test]
    fn unknown_type_is_none_and_bad_json_errors() {
        let unknown = Envelope::new("$nope", "{}").on_channel(CONTROL);
        assert_eq!(ControlMessage::parse(&unknown).unwrap(), None);

        let broken = Envelope::new(CLOSE, "{not-json").on_channel(CONTROL);
        assert!(ControlMessage::parse(&broken).is_err());
    }

    #[test]
    fn close_reason_is_optional() {
        let envelope = Envelope::new(CLOSE, "{}").on_channel(CONTROL);
        assert_eq!(
            ControlMessage::parse(&envelope).unwrap(),
            Some(ControlMessage::close(""))
        );
    }
}
