use std::fs;
use std::time::Duration;

use sessionprims_endpoint::{Address, ClientIdentity, Endpoint, EndpointConfig};
use sessionprims_frame::Envelope;
use uuid::Uuid;

use crate::cmd::SendArgs;
use crate::exit::{endpoint_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_envelope, OutputFormat};

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let address: Address = args
        .addr
        .parse()
        .map_err(|err| endpoint_error("invalid address", err))?;
    let data = resolve_data(&args)?;

    let user_id = match &args.user_id {
        Some(raw) => Uuid::parse_str(raw)
            .map_err(|err| CliError::new(USAGE, format!("--user-id is not a UUID: {err}")))?,
        None => Uuid::new_v4(),
    };
    let defaults = EndpointConfig::client(ClientIdentity::new(user_id, args.device_id.clone()));
    let config = EndpointConfig {
        registration_timeout: wait_timeout,
        chunk_size: args.chunk_size.unwrap_or(defaults.chunk_size),
        serializer: args.serializer.build(),
        ..defaults
    };

    let endpoint = Endpoint::builder(config)
        .connect(&address)
        .await
        .map_err(|err| endpoint_error("connect failed", err))?;
    tracing::debug!(connection_id = %endpoint.connection_id(), "registered");

    let envelope = Envelope::new(args.message_type.as_str(), data).on_channel(args.channel.as_str());
    let result = if args.wait {
        endpoint
            .request(envelope, wait_timeout)
            .await
            .map(|reply| print_envelope(&reply, &endpoint.connection_id(), format))
            .map_err(|err| endpoint_error("request failed", err))
    } else {
        endpoint
            .send(envelope)
            .await
            .map(|_| ())
            .map_err(|err| endpoint_error("send failed", err))
    };
    endpoint.close().await;

    result.map(|()| SUCCESS)
}

fn resolve_data(args: &SendArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.clone());
    }
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(String::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
