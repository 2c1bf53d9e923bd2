use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sessionprims_endpoint::EndpointStats;
use sessionprims_frame::Envelope;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EnvelopeOutput<'a> {
    msg_id: &'a str,
    sent_time_ticks: i64,
    channel: &'a str,
    message_type: &'a str,
    reply_to: &'a str,
    data_size: usize,
    data: &'a str,
    connection_id: &'a str,
}

pub fn print_envelope(envelope: &Envelope, connection_id: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EnvelopeOutput {
                msg_id: &envelope.msg_id,
                sent_time_ticks: envelope.sent_time.0,
                channel: &envelope.channel,
                message_type: &envelope.message_type,
                reply_to: &envelope.reply_to,
                data_size: envelope.data_len(),
                data: &envelope.data,
                connection_id,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "TYPE", "SIZE", "CONNECTION", "DATA"])
                .add_row(vec![
                    envelope.channel.clone(),
                    envelope.message_type.clone(),
                    envelope.data_len().to_string(),
                    connection_id.to_string(),
                    envelope.data.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} type={} size={} connection={} data={}",
                envelope.channel,
                envelope.message_type,
                envelope.data_len(),
                connection_id,
                envelope.data
            );
        }
        OutputFormat::Raw => print_raw(envelope.data.as_bytes()),
    }
}

pub fn print_stats(connection_id: &str, stats: &EndpointStats, format: OutputFormat) {
    let rows = [
        ("messages_sent", stats.messages_sent),
        ("messages_received", stats.messages_received),
        ("bytes_sent", stats.bytes_sent),
        ("bytes_received", stats.bytes_received),
        ("chunked_sent", stats.chunked_sent),
        ("chunked_received", stats.chunked_received),
        ("dispatch_failures", stats.dispatch_failures),
    ];
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            out.insert("connection_id".to_string(), connection_id.into());
            for (name, value) in rows {
                out.insert(name.to_string(), value.into());
            }
            println!("{}", serde_json::Value::Object(out));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"])
                .add_row(vec!["connection_id".to_string(), connection_id.to_string()]);
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let rendered: Vec<_> = rows
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("connection={connection_id} {}", rendered.join(" "));
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
