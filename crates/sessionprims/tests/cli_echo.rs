#![cfg(feature = "cli")]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use sessionprims_endpoint::{connect_tcp, ClientIdentity, Endpoint, EndpointConfig};
use sessionprims_frame::Envelope;
use uuid::Uuid;

struct EchoServer {
    child: Child,
    addr: String,
}

impl EchoServer {
    fn start() -> Self {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("free port should be available")
            .port();
        let addr = format!("127.0.0.1:{port}");
        let child = Command::new(env!("CARGO_BIN_EXE_sessionprims"))
            .args(["--log-level", "error", "--format", "json", "echo"])
            .arg(format!("tcp://{addr}"))
            .args(["--channels", "echo,orders"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("echo command should start");
        Self { child, addr }
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn client_config() -> EndpointConfig {
    EndpointConfig::client(ClientIdentity::new(Uuid::new_v4(), "cli-test"))
}

async fn wait_for_connect(addr: &str, timeout: Duration) -> Endpoint {
    let start = Instant::now();
    loop {
        match connect_tcp(addr, client_config()).await {
            Ok(endpoint) => return endpoint,
            Err(err) => {
                assert!(start.elapsed() < timeout, "connect timeout: {err}");
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }
    }
}

#[tokio::test]
async fn echo_server_replies_on_configured_channels() {
    let server = EchoServer::start();
    let client = wait_for_connect(&server.addr, Duration::from_secs(5)).await;
    assert!(client.is_registered());

    let reply = client
        .request(
            Envelope::new("Order.Created", "{\"id\":42}").on_channel("orders"),
            Duration::from_secs(5),
        )
        .await
        .expect("echo reply should arrive");
    assert_eq!(reply.channel, "orders");
    assert_eq!(reply.message_type, "Order.Created");
    assert_eq!(reply.data, "{\"id\":42}");

    let err = client
        .request(
            Envelope::new("Ignored", "x").on_channel("elsewhere"),
            Duration::from_millis(200),
        )
        .await
        .expect_err("unconfigured channel should not be echoed");
    assert!(matches!(
        err,
        sessionprims_endpoint::EndpointError::Timeout(_)
    ));

    client.close().await;
}

#[tokio::test]
async fn send_command_prints_reply_as_json() {
    let server = EchoServer::start();
    // Make sure the server is accepting before running the one-shot client.
    wait_for_connect(&server.addr, Duration::from_secs(5))
        .await
        .close()
        .await;

    let addr = server.addr.clone();
    let output = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_sessionprims"))
            .args(["--log-level", "error", "--format", "json", "send"])
            .arg(addr)
            .args(["--channel", "echo", "--data", "ping", "--wait"])
            .output()
    })
    .await
    .expect("send task should not panic")
    .expect("send command should run");

    assert!(output.status.success(), "send failed: {output:?}");
    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    let reply: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("stdout should be JSON");
    assert_eq!(reply["channel"], "echo");
    assert_eq!(reply["data"], "ping");
    assert_eq!(reply["message_type"], "Message");
}
