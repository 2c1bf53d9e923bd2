use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use sessionprims_frame::{BinarySerializer, EnvelopeSerializer, JsonSerializer};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod echo;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept connections and echo messages back on the same channel.
    Echo(EchoArgs),
    /// Connect, register, and send a single message.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => block_on(echo::run(args, format)),
        Command::Send(args) => block_on(send::run(args, format)),
        Command::Version(args) => version::run(args),
    }
}

fn block_on(future: impl Future<Output = CliResult<i32>>) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(future)
}

/// Envelope encoding on the wire.
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum SerializerKind {
    /// JSON text messages.
    #[default]
    Json,
    /// Binary codec messages.
    Binary,
}

impl SerializerKind {
    pub fn build(self) -> Arc<dyn EnvelopeSerializer> {
        match self {
            SerializerKind::Json => Arc::new(JsonSerializer),
            SerializerKind::Binary => Arc::new(BinarySerializer),
        }
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to listen on: tcp://host:port, ws://host:port, or host:port.
    pub addr: String,
    /// Channels to echo (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "echo")]
    pub channels: Vec<String>,
    /// Envelope encoding.
    #[arg(long, value_enum, default_value_t = SerializerKind::Json)]
    pub serializer: SerializerKind,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to: tcp://host:port, ws://host:port/path, or host:port.
    pub addr: String,
    /// Channel to send on.
    #[arg(long, short = 'c', default_value = "echo")]
    pub channel: String,
    /// Message type.
    #[arg(long = "type", short = 't', default_value = "Message")]
    pub message_type: String,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for the reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Registration and reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// User id to register with. Default: random.
    #[arg(long, env = "SESSIONPRIMS_USER_ID")]
    pub user_id: Option<String>,
    /// Device id to register with.
    #[arg(long, env = "SESSIONPRIMS_DEVICE_ID", default_value = "sessionprims-cli")]
    pub device_id: String,
    /// Split payloads longer than this many characters.
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Envelope encoding.
    #[arg(long, value_enum, default_value_t = SerializerKind::Json)]
    pub serializer: SerializerKind,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
