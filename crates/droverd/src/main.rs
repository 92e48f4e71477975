//! Daemon entrypoint for a single drover browser session.
//!
//! The binary initialises telemetry from the environment and hands control
//! to [`droverd::run_daemon`], which owns the session for its whole life.

use std::process::ExitCode;

use droverd::{TelemetrySettings, initialise, run_daemon};

#[expect(
    clippy::print_stderr,
    reason = "startup failures must reach the operator before telemetry exists"
)]
fn main() -> ExitCode {
    if let Err(error) = initialise(&TelemetrySettings::from_env()) {
        eprintln!("droverd: {error}");
        return ExitCode::FAILURE;
    }
    match run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("daemon failed: {error}");
            eprintln!("droverd: {error}");
            ExitCode::FAILURE
        }
    }
}
