use sessionprims_frame::FrameError;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream carried an invalid frame.
    #[error("framing error: {0}")]
    Frame(FrameError),

    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    WebSocket(Box<WsError>),

    /// A payload cannot be carried as the requested message kind.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// True for faults caused by the peer violating the wire protocol.
    ///
    /// Everything else is an I/O fault: the connection is lost, not broken.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Self::Frame(err) => !matches!(err, FrameError::ConnectionClosed | FrameError::Io(_)),
            Self::WebSocket(err) => !matches!(
                err.as_ref(),
                WsError::Io(_)
                    | WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
            ),
            Self::InvalidPayload(_) => true,
            Self::Connect { .. } | Self::Bind { .. } | Self::Accept(_) | Self::Io(_) | Self::Closed => {
                false
            }
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => Self::Io(io),
            other => Self::Frame(other),
        }
    }
}

impl From<WsError> for TransportError {
    fn from(err: WsError) -> Self {
        match err {
            WsError::Io(io) => Self::Io(io),
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::Closed,
            other => Self::WebSocket(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_faults_are_not_protocol_violations() {
        let err: TransportError =
            FrameError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).into();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.is_protocol_violation());
        assert!(!TransportError::Frame(FrameError::ConnectionClosed).is_protocol_violation());
        assert!(!TransportError::Closed.is_protocol_violation());
    }

    #[test]
    fn bad_frames_are_protocol_violations() {
        let err: TransportError = FrameError::InvalidLength(-4).into();
        assert!(err.is_protocol_violation());
        let err: TransportError = FrameError::PayloadTooLarge { size: 9, max: 1 }.into();
        assert!(err.is_protocol_violation());
        assert!(TransportError::InvalidPayload("x".into()).is_protocol_violation());
    }

    #[test]
    fn websocket_reset_is_lost_not_violation() {
        let err: TransportError =
            WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake).into();
        assert!(!err.is_protocol_violation());
        let err: TransportError = WsError::Protocol(ProtocolError::NonZeroReservedBits).into();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn websocket_close_maps_to_closed() {
        let err: TransportError = WsError::ConnectionClosed.into();
        assert!(matches!(err, TransportError::Closed));
    }
}
