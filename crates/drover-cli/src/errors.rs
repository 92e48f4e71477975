//! Error types and diagnostics helpers for the CLI runtime.

use std::ffi::OsString;
use std::io;
use std::time::Duration;

use thiserror::Error;

use drover_config::SessionNameError;
use drover_protocol::{DecodeError, EncodeError};
use drover_registry::RegistryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("invalid session name: {0}")]
    Session(#[from] SessionNameError),
    #[error("session registry failure: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to resolve daemon address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    #[error("failed to serialise command: {0}")]
    Encode(#[from] EncodeError),
    #[error("failed to send command to daemon: {0}")]
    Send(io::Error),
    #[error("failed to read response from daemon: {0}")]
    ReadResponse(io::Error),
    #[error("daemon closed the connection without a response")]
    MissingResponse,
    #[error("failed to parse daemon response: {0}")]
    Decode(#[from] DecodeError),
    #[error("argument '{argument}' is not valid JSON: {source}")]
    ScriptArgument {
        argument: String,
        source: serde_json::Error,
    },
    #[error("failed to launch session daemon '{}': {source}", binary.to_string_lossy())]
    LaunchDaemon { binary: OsString, source: io::Error },
    #[error("session daemon exited during startup with {status}")]
    DaemonExited { status: std::process::ExitStatus },
    #[error("session daemon did not become ready within {:?}", timeout)]
    SpawnTimeout { timeout: Duration },
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("{message}")]
    Daemon { message: String },
}

/// True when the error indicates no daemon is listening at the endpoint,
/// which is the one condition that justifies a spawn attempt.
pub(crate) fn is_daemon_unreachable(error: &AppError) -> bool {
    match error {
        AppError::Connect { source, .. } => matches!(
            source.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotFound
                | io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}
