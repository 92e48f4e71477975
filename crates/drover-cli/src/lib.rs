//! Command-line client for drover browser sessions.
//!
//! The crate owns argument parsing, request construction, the
//! resolve-or-spawn connection path to the session daemon, and response
//! rendering. The runtime is exercised both from the binary entrypoint and
//! from tests where the registry and IO streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use drover_config::SessionName;
use drover_protocol::Outcome;

mod cli;
mod command;
mod connector;
mod errors;
mod output;
mod transport;

use cli::Cli;
use command::{action_for, command_for};
use connector::Connector;
use errors::AppError;
use output::render_data;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, stdout_is_terminal, &Connector::new())
}

fn run_with<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    stdout_is_terminal: bool,
    connector: &Connector,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(cli, stdout, stdout_is_terminal, connector) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(
    cli: Cli,
    stdout: &mut W,
    stdout_is_terminal: bool,
    connector: &Connector,
) -> Result<ExitCode, AppError> {
    let format = cli.output.resolve(stdout_is_terminal);
    let session = SessionName::resolve(cli.session.as_deref())?;

    let action = match action_for(cli.command)? {
        Some(action) => action,
        // `sessions` is the one command answered locally from the registry.
        None => return list_sessions(connector, stdout),
    };
    let response = connector.send(&session, &command_for(action))?;
    match response.outcome {
        Outcome::Success(data) => {
            stdout
                .write_all(render_data(&data, format).as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(AppError::WriteOutput)?;
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failure(message) => Err(AppError::Daemon { message }),
    }
}

/// Prints the names of live sessions, one per line.
fn list_sessions<W: Write>(connector: &Connector, stdout: &mut W) -> Result<ExitCode, AppError> {
    let sessions = connector.registry().list()?;
    for name in sessions {
        writeln!(stdout, "{name}").map_err(AppError::WriteOutput)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Routes clap output to the right stream with the right exit code.
///
/// `--help` and `--version` arrive as errors but are successful output.
fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    if error.use_stderr() {
        let _ = write!(stderr, "{error}");
        ExitCode::FAILURE
    } else {
        let _ = write!(stdout, "{error}");
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::process;
    use std::thread;
    use std::time::Duration;

    use camino::Utf8PathBuf;
    use drover_config::SocketEndpoint;
    use drover_protocol::{Response, encode_response};
    use drover_registry::{Registry, SessionRecord};
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_connector() -> (TempDir, Registry, Connector) {
        let dir = TempDir::new().expect("temp dir");
        let registry = Registry::at(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir"),
        );
        let connector = Connector::with_registry(registry.clone(), Duration::from_millis(300));
        (dir, registry, connector)
    }

    fn run_cli(args: &[&str], connector: &Connector) -> (ExitCode, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit_code = run_with(
            args.iter().map(OsString::from),
            &mut stdout,
            &mut stderr,
            false,
            connector,
        );
        (
            exit_code,
            String::from_utf8(stdout).expect("utf8 stdout"),
            String::from_utf8(stderr).expect("utf8 stderr"),
        )
    }

    fn register_fake_daemon(
        registry: &Registry,
        session: &str,
        response: Response,
    ) -> thread::JoinHandle<()> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake daemon");
        let addr = listener.local_addr().expect("local addr");
        registry
            .register(
                &session.parse().expect("session name"),
                &SessionRecord {
                    pid: process::id(),
                    endpoint: SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
                },
            )
            .expect("register");
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request = String::new();
            reader.read_line(&mut request).expect("read request");
            let encoded = encode_response(&response).expect("encode response");
            std::io::Write::write_all(&mut stream, &encoded).expect("write response");
        })
    }

    #[rstest]
    fn successful_command_prints_json_payload() {
        let (_dir, registry, connector) = test_connector();
        let response = Response::success("any", json!({"clicked": true}));
        let daemon = register_fake_daemon(&registry, "ui", response);

        let (exit_code, stdout, stderr) =
            run_cli(&["drover", "--session", "ui", "click", "#submit"], &connector);
        daemon.join().expect("join fake daemon");

        assert_eq!(exit_code, ExitCode::SUCCESS);
        assert_eq!(stdout, "{\"clicked\":true}\n");
        assert!(stderr.is_empty());
    }

    #[rstest]
    fn daemon_failure_reaches_stderr_with_failure_exit() {
        let (_dir, registry, connector) = test_connector();
        let response = Response::failure(Some("any".to_owned()), "no element matches #missing");
        let daemon = register_fake_daemon(&registry, "ui", response);

        let (exit_code, stdout, stderr) =
            run_cli(&["drover", "--session", "ui", "click", "#missing"], &connector);
        daemon.join().expect("join fake daemon");

        assert_eq!(exit_code, ExitCode::FAILURE);
        assert!(stdout.is_empty());
        assert!(stderr.contains("no element matches #missing"));
    }

    #[rstest]
    fn sessions_lists_live_names_without_contacting_a_daemon() {
        let (_dir, registry, connector) = test_connector();
        for name in ["alpha", "beta"] {
            registry
                .register(
                    &name.parse().expect("session name"),
                    &SessionRecord {
                        pid: process::id(),
                        endpoint: SocketEndpoint::tcp("127.0.0.1", 1),
                    },
                )
                .expect("register");
        }

        let (exit_code, stdout, _stderr) = run_cli(&["drover", "sessions"], &connector);
        assert_eq!(exit_code, ExitCode::SUCCESS);
        assert_eq!(stdout, "alpha\nbeta\n");
    }

    #[rstest]
    fn usage_errors_go_to_stderr() {
        let (_dir, _registry, connector) = test_connector();
        let (exit_code, stdout, stderr) = run_cli(&["drover", "no-such-command"], &connector);
        assert_eq!(exit_code, ExitCode::FAILURE);
        assert!(stdout.is_empty());
        assert!(stderr.contains("no-such-command"));
    }

    #[rstest]
    fn help_goes_to_stdout_with_success() {
        let (_dir, _registry, connector) = test_connector();
        let (exit_code, stdout, _stderr) = run_cli(&["drover", "--help"], &connector);
        assert_eq!(exit_code, ExitCode::SUCCESS);
        assert!(stdout.contains("Usage"));
    }
}
