//! Resolves or spawns the session daemon and exchanges one command.
//!
//! The contract is `send(session, command) -> response` with exactly one
//! spawn attempt per call: resolve the session via the registry; when that
//! fails, or the recorded endpoint refuses the connection (the record went
//! stale between the liveness probe and the connect), drop the stale record,
//! spawn a daemon, wait for it to register, and connect once more. A failure after a successful
//! spawn is reported rather than retried, so a broken daemon binary cannot
//! cause a respawn loop.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use drover_config::{SESSION_ENV_VAR, SessionName};
use drover_protocol::{Command, Response, decode_response, encode_command};
use drover_registry::{Registry, SessionRecord};

use crate::errors::{AppError, is_daemon_unreachable};
use crate::transport::{Connection, connect};

const DAEMON_BIN_ENV_VAR: &str = "DROVERD_BIN";
const DEFAULT_DAEMON_BINARY: &str = "droverd";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Sends commands to session daemons, spawning them on demand.
pub(crate) struct Connector {
    registry: Registry,
    startup_timeout: Duration,
    binary_override: Option<OsString>,
}

impl Connector {
    pub(crate) fn new() -> Self {
        Self {
            registry: Registry::open_default(),
            startup_timeout: STARTUP_TIMEOUT,
            binary_override: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_registry(registry: Registry, startup_timeout: Duration) -> Self {
        Self {
            registry,
            startup_timeout,
            binary_override: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_binary(mut self, binary: impl Into<OsString>) -> Self {
        self.binary_override = Some(binary.into());
        self
    }

    pub(crate) const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Delivers one command to the session daemon and returns its response.
    pub(crate) fn send(
        &self,
        session: &SessionName,
        command: &Command,
    ) -> Result<Response, AppError> {
        if let Some(record) = self.registry.resolve(session)? {
            match exchange(&record, command) {
                Err(error) if is_daemon_unreachable(&error) => {
                    // Stale record race: the daemon died after the liveness
                    // probe. Drop the record so the readiness wait below sees
                    // the replacement's registration rather than this one,
                    // then fall through to the single spawn attempt.
                    self.registry.unregister(session)?;
                }
                settled => return settled,
            }
        }
        let record = self.spawn_and_await(session)?;
        exchange(&record, command)
    }

    fn spawn_and_await(&self, session: &SessionName) -> Result<SessionRecord, AppError> {
        let mut child = spawn_daemon(session, self.binary_override.as_deref())?;
        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if let Some(record) = self.registry.resolve(session)? {
                return Ok(record);
            }
            // In background mode the spawned process exits once the real
            // daemon has detached, so a clean exit is not a failure.
            if let Ok(Some(status)) = child.try_wait()
                && !status.success()
            {
                return Err(AppError::DaemonExited { status });
            }
            if Instant::now() >= deadline {
                return Err(AppError::SpawnTimeout {
                    timeout: self.startup_timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn exchange(record: &SessionRecord, command: &Command) -> Result<Response, AppError> {
    let mut connection = connect(&record.endpoint)?;
    let encoded = encode_command(command)?;
    connection
        .write_all(&encoded)
        .and_then(|()| connection.flush())
        .map_err(AppError::Send)?;
    read_response(connection)
}

fn read_response(connection: Connection) -> Result<Response, AppError> {
    let mut reader = BufReader::new(connection);
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .map_err(AppError::ReadResponse)?;
    if bytes_read == 0 {
        return Err(AppError::MissingResponse);
    }
    Ok(decode_response(line.as_bytes())?)
}

fn spawn_daemon(
    session: &SessionName,
    binary_override: Option<&OsStr>,
) -> Result<Child, AppError> {
    let binary = resolve_daemon_binary(binary_override);
    let mut command = ProcessCommand::new(&binary);
    command
        .env(SESSION_ENV_VAR, session.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        // Keep stderr attached so early startup failures reach the operator.
        .stderr(Stdio::inherit());
    command
        .spawn()
        .map_err(|source| AppError::LaunchDaemon { binary, source })
}

fn resolve_daemon_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(DAEMON_BIN_ENV_VAR))
        .unwrap_or_else(|| OsString::from(DEFAULT_DAEMON_BINARY))
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use std::net::TcpListener;
    use std::process;

    use camino::Utf8PathBuf;
    use drover_config::SocketEndpoint;
    use drover_protocol::{Action, encode_response};
    use rstest::rstest;
    use tempfile::TempDir;

    fn test_registry() -> (TempDir, Registry) {
        let dir = TempDir::new().expect("temp dir");
        let registry = Registry::at(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir"),
        );
        (dir, registry)
    }

    fn session(name: &str) -> SessionName {
        name.parse().expect("valid session name")
    }

    fn command() -> Command {
        Command {
            id: "c-1".to_owned(),
            action: Action::Snapshot,
        }
    }

    /// Serves one scripted response on an ephemeral TCP port.
    fn fake_daemon(response: Response) -> (SocketEndpoint, thread::JoinHandle<String>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake daemon");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request = String::new();
            reader.read_line(&mut request).expect("read request");
            let encoded = encode_response(&response).expect("encode response");
            stream.write_all(&encoded).expect("write response");
            request
        });
        (
            SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
            handle,
        )
    }

    #[rstest]
    fn send_reaches_a_registered_daemon() {
        let (_dir, registry) = test_registry();
        let name = session("live");
        let expected = Response::success("c-1", serde_json::json!({"snapshot": "document"}));
        let (endpoint, daemon) = fake_daemon(expected.clone());
        registry
            .register(
                &name,
                &SessionRecord {
                    pid: process::id(),
                    endpoint,
                },
            )
            .expect("register");

        let connector = Connector::with_registry(registry, Duration::from_millis(300));
        let response = connector.send(&name, &command()).expect("send");
        assert_eq!(response, expected);

        let request = daemon.join().expect("join fake daemon");
        assert!(request.contains(r#""action":"snapshot""#));
    }

    #[rstest]
    fn spawn_failure_names_the_missing_binary() {
        let error = spawn_daemon(&session("ghost"), Some(OsStr::new("/nonexistent/droverd")))
            .expect_err("spawn should fail");
        assert!(matches!(error, AppError::LaunchDaemon { .. }));
        assert!(error.to_string().contains("/nonexistent/droverd"));
    }

    #[rstest]
    fn stale_endpoint_with_live_pid_falls_back_to_spawn_path() {
        let (_dir, registry) = test_registry();
        let name = session("stale");
        // Our own pid is alive, but nothing listens on the endpoint, so the
        // connect fails, the record is dropped, and the connector attempts
        // its single spawn. The spawned process never registers, so the
        // readiness wait runs out instead of re-resolving the dead endpoint.
        let port = {
            let probe = TcpListener::bind(("127.0.0.1", 0)).expect("probe bind");
            probe.local_addr().expect("probe addr").port()
        };
        registry
            .register(
                &name,
                &SessionRecord {
                    pid: process::id(),
                    endpoint: SocketEndpoint::tcp("127.0.0.1", port),
                },
            )
            .expect("register");

        // `true` exits successfully without ever registering, so the wait
        // runs out rather than looping on respawns.
        let connector =
            Connector::with_registry(registry, Duration::from_millis(200)).with_binary("true");
        let result = connector.send(&name, &command());
        assert!(matches!(result, Err(AppError::SpawnTimeout { .. })));
        // The unreachable record must be gone, not waiting to mislead the
        // next invocation.
        assert_eq!(connector.registry().resolve(&name).expect("resolve"), None);
    }

    #[test]
    fn daemon_binary_override_takes_precedence() {
        let resolved = resolve_daemon_binary(Some(OsStr::new("/custom/droverd")));
        assert_eq!(resolved, OsString::from("/custom/droverd"));
    }
}
