use std::fmt;
use std::str::FromStr;

use sessionprims_transport::{StreamTransport, Transport, WsTransport};

use crate::config::{EndpointConfig, Role};
use crate::endpoint::{Endpoint, EndpointBuilder};
use crate::error::{EndpointError, Result};

/// Where to reach a listening endpoint.
///
/// Parses from `tcp://host:port`, `ws://host:port/path`, or a bare
/// `host:port` (TCP). `wss://` is refused: no TLS connector is built in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Length-prefixed stream over TCP, as `host:port`.
    Tcp(String),
    /// WebSocket URL.
    Ws(String),
}

impl FromStr for Address {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("tcp://") {
            return tcp(rest, s);
        }
        if s.starts_with("wss://") {
            return Err(EndpointError::UnsupportedScheme("wss".to_string()));
        }
        if let Some(rest) = s.strip_prefix("ws://") {
            if rest.is_empty() {
                return Err(EndpointError::InvalidAddress(s.to_string()));
            }
            return Ok(Self::Ws(s.to_string()));
        }
        if s.contains("://") {
            return Err(EndpointError::InvalidAddress(s.to_string()));
        }
        tcp(s, s)
    }
}

fn tcp(host_port: &str, original: &str) -> Result<Address> {
    match host_port.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(Address::Tcp(host_port.to_string()))
        }
        _ => Err(EndpointError::InvalidAddress(original.to_string())),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Ws(url) => f.write_str(url),
        }
    }
}

impl EndpointBuilder {
    /// Dial `address`, start the endpoint, and wait for registration.
    ///
    /// Server-role builders return as soon as the transport is up.
    pub async fn connect(self, address: &Address) -> Result<Endpoint> {
        match address {
            Address::Tcp(addr) => {
                let transport = StreamTransport::connect(addr)
                    .await?
                    .with_max_payload(self.config().max_message_size);
                self.start_registered(transport).await
            }
            Address::Ws(url) => {
                let transport = WsTransport::connect(url).await?;
                self.start_registered(transport).await
            }
        }
    }

    async fn start_registered<T: Transport>(self, transport: T) -> Result<Endpoint> {
        let client = matches!(self.config().role, Role::Client(_));
        let timeout = self.config().registration_timeout;
        let endpoint = self.start(transport)?;
        if client {
            if let Err(err) = endpoint.wait_registered(timeout).await {
                endpoint.disconnect();
                return Err(err);
            }
        }
        Ok(endpoint)
    }
}

/// Connect over TCP with `config` and wait for registration.
pub async fn connect_tcp(addr: &str, config: EndpointConfig) -> Result<Endpoint> {
    Endpoint::builder(config)
        .connect(&Address::Tcp(addr.to_string()))
        .await
}

/// Connect over WebSocket with `config` and wait for registration.
pub async fn connect_ws(url: &str, config: EndpointConfig) -> Result<Endpoint> {
    Endpoint::builder(config)
        .connect(&Address::Ws(url.to_string()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addresses() {
        assert_eq!(
            "tcp://127.0.0.1:9000".parse::<Address>().unwrap(),
            Address::Tcp("127.0.0.1:9000".to_string())
        );
        assert_eq!(
            "localhost:80".parse::<Address>().unwrap(),
            Address::Tcp("localhost:80".to_string())
        );
        assert_eq!(
            "ws://example.com:8080/sessions".parse::<Address>().unwrap(),
            Address::Ws("ws://example.com:8080/sessions".to_string())
        );
    }

    #[test]
    fn tls_scheme_is_refused() {
        let err = "wss://secure.example.com".parse::<Address>().unwrap_err();
        assert!(matches!(err, EndpointError::UnsupportedScheme(ref scheme) if scheme == "wss"));
        assert!(err.to_string().contains("wss"));
    }

    #[test]
    fn rejects_bad_addresses() {
        for bad in ["", "no-port", ":9000", "host:notaport", "udp://h:1", "ws://"] {
            assert!(
                matches!(bad.parse::<Address>(), Err(EndpointError::InvalidAddress(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn display_roundtrips_through_parse() {
        let addr: Address = "127.0.0.1:7000".parse().unwrap();
        assert_eq!(addr.to_string(), "tcp://127.0.0.1:7000");
        assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect_tcp(&addr, EndpointConfig::server())
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::Transport(_)));
    }
}
