//! Structured telemetry initialisation for the daemon.

use std::env;
use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use drover_config::{DEFAULT_LOG_FILTER, LogFormat};

const FILTER_ENV_VAR: &str = "DROVER_LOG";
const FORMAT_ENV_VAR: &str = "DROVER_LOG_FORMAT";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Telemetry settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Log filter expression, for example `info` or `droverd=debug`.
    pub filter: String,
    /// Output format for the stderr sink.
    pub format: LogFormat,
}

impl TelemetrySettings {
    /// Reads settings from `DROVER_LOG` and `DROVER_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        let filter = env::var(FILTER_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
        let format = env::var(FORMAT_ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        Self { filter, format }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
            format: LogFormat::default(),
        }
    }
}

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber; subsequent invocations return a fresh [`TelemetryHandle`]
/// without touching global state again.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter expression is invalid or a
/// conflicting subscriber is already installed.
pub fn initialise(settings: &TelemetrySettings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            // Avoid stray colour codes in non-TTY sinks while keeping colour on
            // interactive terminals.
            .with_ansi(io::stderr().is_terminal())
            // Add a timestamp so operators can correlate daemon activity.
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => {
            let json_builder = builder(filter).json();
            let json = json_builder.flatten_event(true).finish();
            Box::new(json)
        }
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
