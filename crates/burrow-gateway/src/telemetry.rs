use clap::ValueEnum;
use thiserror::Error;
use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_ENV_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to set global logger")]
    SetGlobalLogger(#[from] tracing_log::log_tracer::SetLoggerError),
    #[error("failed to set global subscriber")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn build_json_subscriber<Sink>(
    env_filter: EnvFilter,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let formatting_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(sink);

    Registry::default().with(env_filter).with(formatting_layer)
}

pub fn build_plain_subscriber<Sink>(
    env_filter: EnvFilter,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(sink);

    Registry::default().with(env_filter).with(formatting_layer)
}

/// Installs `subscriber` globally and routes `log` records into it.
pub fn try_init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<(), TelemetryError> {
    LogTracer::init()?;
    set_global_default(subscriber)?;

    Ok(())
}

/// Installs the process-wide subscriber writing to stdout.
pub fn init(format: LogFormat) -> Result<(), TelemetryError> {
    match format {
        LogFormat::Json => try_init_subscriber(build_json_subscriber(
            env_filter(DEFAULT_ENV_FILTER),
            std::io::stdout,
        )),
        LogFormat::Plain => try_init_subscriber(build_plain_subscriber(
            env_filter(DEFAULT_ENV_FILTER),
            std::io::stdout,
        )),
    }
}

/// `RUST_LOG` when set and valid, `default` otherwise.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
