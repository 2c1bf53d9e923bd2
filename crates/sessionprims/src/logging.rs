use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full filter directives when set.
pub const LOG_ENV: &str = "SESSIONPRIMS_LOG";

/// Crates whose events follow `--log-level`. Everything else (the
/// WebSocket stack, mostly) stays at warn unless `--log-level error`.
const SESSION_TARGETS: [&str; 5] = [
    "sessionprims",
    "sessionprims_codec",
    "sessionprims_frame",
    "sessionprims_transport",
    "sessionprims_endpoint",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter directives for `level`, e.g. `warn,sessionprims_endpoint=debug,...`.
fn directives(level: LogLevel) -> String {
    let fallback = if level == LogLevel::Error { "error" } else { "warn" };
    SESSION_TARGETS
        .iter()
        .fold(fallback.to_string(), |mut acc, target| {
            acc.push(',');
            acc.push_str(target);
            acc.push('=');
            acc.push_str(level.directive());
            acc
        })
}

fn filter(level: LogLevel) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(directives(level)))
}

/// Route endpoint logs to stderr so stdout stays machine-readable.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level))
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().with_current_span(false).try_init();
        }
    }
}
