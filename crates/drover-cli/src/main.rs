//! CLI entrypoint for the drover browser-automation client.
//!
//! The binary delegates to [`drover_cli::run`], which parses arguments,
//! resolves or spawns the session daemon, forwards one command, and renders
//! the response.

use std::io::{self, IsTerminal, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout_is_terminal = io::stdout().is_terminal();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    drover_cli::run(
        std::env::args_os(),
        &mut stdout,
        &mut stderr,
        stdout_is_terminal,
    )
}
