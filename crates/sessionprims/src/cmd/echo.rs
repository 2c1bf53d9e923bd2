use std::sync::Arc;

use sessionprims_endpoint::{
    Address, ConnectionRegistry, DispatchResult, Endpoint, EndpointConfig, EndpointError,
    EndpointListener, EndpointObserver, ListenMode,
};
use sessionprims_frame::Envelope;
use tracing::{debug, info, warn};

use crate::cmd::EchoArgs;
use crate::exit::{endpoint_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_stats, OutputFormat};

/// Prints each connection's counters when it closes.
struct StatsReporter {
    format: OutputFormat,
}

impl EndpointObserver for StatsReporter {
    fn on_connection_closed(&self, endpoint: &Endpoint) {
        print_stats(&endpoint.connection_id(), &endpoint.stats(), self.format);
    }
}

pub async fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let (bind_addr, mode) = listen_target(&args.addr)?;
    let registry = Arc::new(ConnectionRegistry::new());
    let config = EndpointConfig {
        serializer: args.serializer.build(),
        ..EndpointConfig::server()
    };

    let mut listener = EndpointListener::bind(&bind_addr, mode)
        .await
        .map_err(|err| endpoint_error("bind failed", err))?
        .with_config(config)
        .with_observer(registry.clone())
        .with_observer(Arc::new(StatsReporter { format }));
    for channel in &args.channels {
        listener = listener.with_handler(channel.clone(), echo);
    }
    let local = listener
        .local_addr()
        .map_err(|err| endpoint_error("bind failed", err))?;
    info!(addr = %local, ?mode, channels = ?args.channels, "echo server ready");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.map_err(|err| io_error("signal handler setup failed", err))?;
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(endpoint) => debug!(
                    connection_id = %endpoint.connection_id(),
                    peer = ?endpoint.peer_addr(),
                    "connection accepted"
                ),
                Err(err) => warn!(%err, "accept failed"),
            },
        }
    }

    info!(connections = registry.len(), "shutting down");
    for connection_id in registry.connection_ids() {
        if let Some(endpoint) = registry.get(&connection_id) {
            endpoint.close().await;
        }
    }
    Ok(SUCCESS)
}

fn echo(endpoint: &Endpoint, envelope: &Envelope) -> DispatchResult {
    info!(
        connection_id = %endpoint.connection_id(),
        channel = %envelope.channel,
        message_type = %envelope.message_type,
        size = envelope.data_len(),
        "echoing message"
    );
    match endpoint.reply(envelope, &envelope.message_type, envelope.data.clone()) {
        Ok(_) => DispatchResult::Handled,
        Err(EndpointError::QueueFull) => DispatchResult::Recoverable,
        Err(err) => {
            warn!(connection_id = %endpoint.connection_id(), %err, "echo failed");
            DispatchResult::Fatal
        }
    }
}

fn listen_target(addr: &str) -> CliResult<(String, ListenMode)> {
    let address: Address = addr
        .parse()
        .map_err(|err| endpoint_error("invalid address", err))?;
    match address {
        Address::Tcp(host_port) => Ok((host_port, ListenMode::Tcp)),
        Address::Ws(url) => {
            let rest = url.strip_prefix("ws://").ok_or_else(|| {
                CliError::new(USAGE, format!("cannot listen on {url}: only ws:// is supported"))
            })?;
            let host_port = rest.split_once('/').map_or(rest, |(host_port, _)| host_port);
            Ok((host_port.to_string(), ListenMode::WebSocket))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_target_by_scheme() {
        assert_eq!(
            listen_target("tcp://127.0.0.1:9000").unwrap(),
            ("127.0.0.1:9000".to_string(), ListenMode::Tcp)
        );
        assert_eq!(
            listen_target("0.0.0.0:9000").unwrap(),
            ("0.0.0.0:9000".to_string(), ListenMode::Tcp)
        );
        assert_eq!(
            listen_target("ws://127.0.0.1:9001/sessions").unwrap(),
            ("127.0.0.1:9001".to_string(), ListenMode::WebSocket)
        );
    }

    #[test]
    fn listen_target_rejects_tls_and_garbage() {
        assert_eq!(listen_target("wss://127.0.0.1:9001").unwrap_err().code, USAGE);
        assert_eq!(listen_target("nonsense").unwrap_err().code, USAGE);
    }
}
