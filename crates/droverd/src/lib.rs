//! The Drover session daemon.
//!
//! One `droverd` process serves one named browser session. It binds the
//! session socket, accepts JSONL commands from short-lived CLI invocations,
//! executes them one at a time against the engine, and records itself in the
//! session registry so clients can discover it. The daemon shuts itself down
//! when the session ends: an explicit `close` command, the last tab closing,
//! or the engine becoming unusable.

mod dispatch;
mod process;
mod session;
mod telemetry;
mod transport;

pub use process::{
    DaemonizeError, Daemonizer, LaunchError, LaunchMode, SystemDaemonizer, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle, TelemetrySettings, initialise};
