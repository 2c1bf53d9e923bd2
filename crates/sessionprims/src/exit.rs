use std::fmt;
use std::io;

use sessionprims_endpoint::EndpointError;
use sessionprims_frame::{ChunkError, FrameError};
use sessionprims_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    match err {
        EndpointError::Transport(err) => transport_error(context, err),
        EndpointError::Frame(err) => frame_error(context, err),
        EndpointError::Chunk(ChunkError::InvalidChunkSize) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        EndpointError::Chunk(_) | EndpointError::Json(_) | EndpointError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        EndpointError::ReservedChannel(_)
        | EndpointError::ReservedMessageType(_)
        | EndpointError::InvalidAddress(_)
        | EndpointError::UnsupportedScheme(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        EndpointError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        EndpointError::Closed | EndpointError::Registration(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        EndpointError::QueueFull => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn endpoint_errors_map_to_exit_codes() {
        let timeout = endpoint_error("send", EndpointError::Timeout(Duration::from_secs(1)));
        assert_eq!(timeout.code, TIMEOUT);
        assert!(timeout.message.starts_with("send: "));

        let usage = endpoint_error("send", EndpointError::ReservedChannel("$control".into()));
        assert_eq!(usage.code, USAGE);
        let usage = endpoint_error("send", EndpointError::ReservedMessageType("$chunk".into()));
        assert_eq!(usage.code, USAGE);
        let usage = endpoint_error("connect", EndpointError::UnsupportedScheme("wss".into()));
        assert_eq!(usage.code, USAGE);

        let refused = endpoint_error(
            "connect",
            EndpointError::Transport(TransportError::Connect {
                addr: "127.0.0.1:1".into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(refused.code, FAILURE);

        let protocol = endpoint_error(
            "recv",
            EndpointError::Transport(TransportError::InvalidPayload("bad".into())),
        );
        assert_eq!(protocol.code, TRANSPORT_ERROR);
    }
}
