use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sessionprims_frame::{AssemblerConfig, EnvelopeSerializer, JsonSerializer};
use uuid::Uuid;

/// Stable identity a client presents when it registers.
///
/// `user_id` and `device_id` identify the logical peer across reconnects;
/// the connection id is regenerated for every attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_id: Uuid,
    pub device_id: String,
    /// Extension properties sent with registration.
    /// May carry credential material and is redacted in debug output.
    pub props: Vec<String>,
}

impl ClientIdentity {
    pub fn new(user_id: Uuid, device_id: impl Into<String>) -> Self {
        Self {
            user_id,
            device_id: device_id.into(),
            props: Vec::new(),
        }
    }

    pub fn with_props(mut self, props: Vec<String>) -> Self {
        self.props = props;
        self
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("props", &format_args!("<redacted:{} props>", self.props.len()))
            .finish()
    }
}

/// Which side of the registration handshake an endpoint plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Accepts registrations and assigns connection ids.
    Server,
    /// Registers with the given identity on start.
    Client(ClientIdentity),
}

/// Endpoint behavior configuration.
#[derive(Clone)]
pub struct EndpointConfig {
    pub role: Role,
    /// Messages whose `Data` exceeds this many characters are chunked.
    pub chunk_size: usize,
    /// Largest encoded wire message, in bytes, sent or reassembled.
    pub max_message_size: usize,
    /// Inactivity window after which a partial chunked message is dropped.
    pub reassembly_timeout: Duration,
    pub max_pending_reassemblies: usize,
    /// Time since the last inbound traffic after which the peer counts as dead.
    pub keepalive_timeout: Option<Duration>,
    /// Enforce `keepalive_timeout`. Only peers that send regularly (or ping)
    /// can be held to it.
    pub require_chatty_peer: bool,
    /// Emit keepalive traffic at this interval.
    pub ping_interval: Option<Duration>,
    /// How often reassembly eviction and dead-peer checks run.
    pub housekeeping_interval: Duration,
    /// Client: how long to wait for the registration reply.
    /// Server: how long a peer may stay unregistered.
    pub registration_timeout: Duration,
    pub send_queue_depth: usize,
    pub serializer: Arc<dyn EnvelopeSerializer>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            role: Role::Server,
            chunk_size: 32 * 1024,
            max_message_size: 16 * 1024 * 1024,
            reassembly_timeout: Duration::from_secs(30),
            max_pending_reassemblies: 64,
            keepalive_timeout: None,
            require_chatty_peer: false,
            ping_interval: None,
            housekeeping_interval: Duration::from_secs(1),
            registration_timeout: Duration::from_secs(5),
            send_queue_depth: 256,
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl EndpointConfig {
    pub fn server() -> Self {
        Self::default()
    }

    pub fn client(identity: ClientIdentity) -> Self {
        Self {
            role: Role::Client(identity),
            ..Self::default()
        }
    }

    pub(crate) fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            timeout: self.reassembly_timeout,
            max_pending: self.max_pending_reassemblies,
            max_message_size: self.max_message_size,
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("role", &self.role)
            .field("chunk_size", &self.chunk_size)
            .field("max_message_size", &self.max_message_size)
            .field("reassembly_timeout", &self.reassembly_timeout)
            .field("max_pending_reassemblies", &self.max_pending_reassemblies)
            .field("keepalive_timeout", &self.keepalive_timeout)
            .field("require_chatty_peer", &self.require_chatty_peer)
            .field("ping_interval", &self.ping_interval)
            .field("housekeeping_interval", &self.housekeeping_interval)
            .field("registration_timeout", &self.registration_timeout)
            .field("send_queue_depth", &self.send_queue_depth)
            .field("serializer", &self.serializer.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionprims_frame::PayloadKind;

    #[test]
    fn defaults() {
        let config = EndpointConfig::default();
        assert_eq!(config.role, Role::Server);
        assert_eq!(config.chunk_size, 32 * 1024);
        assert_eq!(config.serializer.kind(), PayloadKind::Text);
        assert!(!config.require_chatty_peer);
        assert_eq!(config.assembler().max_pending, 64);
    }

    #[test]
    fn debug_redacts_identity_props() {
        let identity = ClientIdentity::new(Uuid::nil(), "laptop")
            .with_props(vec!["token=secret".to_string()]);
        let rendered = format!("{:?}", EndpointConfig::client(identity));
        assert!(rendered.contains("laptop"));
        assert!(rendered.contains("<redacted:1 props>"));
        assert!(!rendered.contains("secret"));
    }
}
