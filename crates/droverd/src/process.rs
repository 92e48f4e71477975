//! Daemon process supervision: daemonisation, the session registry guard,
//! and shutdown handling.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::process;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;

use daemonize_me::Daemon;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use drover_config::{
    SessionName, SessionNameError, SocketEndpoint, SocketPreparationError, runtime_directory,
};
use drover_engine::{EngineError, EngineOptions, EngineProvider, StubEngineProvider};
use drover_registry::{Registry, RegistryError, SessionRecord};

use crate::dispatch::SessionConnectionHandler;
use crate::session::SessionHost;
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
const FOREGROUND_ENV_VAR: &str = "DROVER_FOREGROUND";

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; primarily used for debugging and tests.
    Foreground,
}

impl LaunchMode {
    fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Why the daemon is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownCause {
    /// A termination signal arrived.
    Signal,
    /// The session ended: a `close` command or the last tab closing.
    SessionClosed,
    /// The engine can no longer serve commands.
    EngineUnusable,
}

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The session name was invalid.
    #[error("invalid session name: {source}")]
    Session {
        /// Underlying name validation error.
        #[from]
        source: SessionNameError,
    },
    /// Preparing the socket filesystem failed.
    #[error("failed to prepare session socket: {source}")]
    Socket {
        /// Underlying filesystem error.
        #[from]
        source: SocketPreparationError,
    },
    /// The session registry could not be read or written.
    #[error("session registry failure: {source}")]
    Registry {
        /// Underlying registry error.
        #[from]
        source: RegistryError,
    },
    /// A live daemon already serves this session.
    #[error("session '{name}' is already served by pid {pid}")]
    AlreadyRunning {
        /// Session the daemon refused to take over.
        name: SessionName,
        /// Process id of the daemon holding the session.
        pid: u32,
    },
    /// The engine could not be acquired.
    #[error("failed to open engine: {source}")]
    Engine {
        /// Underlying engine error.
        source: EngineError,
    },
    /// Binding or running the socket listener failed.
    #[error("listener failure: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[from]
        source: DaemonizeError,
    },
    /// Installing the shutdown signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the process into the background.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when detaching fails.
    fn daemonize(&self) -> Result<(), DaemonizeError>;
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Default)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self) -> Result<(), DaemonizeError> {
        let work_dir = runtime_directory();
        info!(
            target: PROCESS_TARGET,
            work_dir = %work_dir,
            "daemonising into background"
        );
        let mut daemon = Daemon::new();
        daemon = daemon.work_dir(work_dir.as_std_path());
        daemon = daemon.name(OsStr::new(env!("CARGO_PKG_NAME")));
        daemon.start()?;
        info!(
            target: PROCESS_TARGET,
            "daemon process detached; continuing in child"
        );
        Ok(())
    }
}

/// Forwards the first termination signal into the shutdown channel.
fn install_signal_watcher(shutdown: Sender<ShutdownCause>) -> Result<(), LaunchError> {
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
        .map_err(|source| LaunchError::Signals { source })?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            );
            let _ = shutdown.send(ShutdownCause::Signal);
        }
    });
    Ok(())
}

/// Runs the daemon for the session named in the environment, using the
/// production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when startup fails; a clean shutdown returns `Ok`.
pub fn run_daemon() -> Result<(), LaunchError> {
    let name = SessionName::resolve(None)?;
    let endpoint = name.paths().default_endpoint();
    let registry = Registry::open_default();
    run_daemon_with(
        &name,
        &endpoint,
        LaunchMode::detect(),
        &StubEngineProvider,
        &SystemDaemonizer::new(),
        &registry,
    )
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with(
    name: &SessionName,
    endpoint: &SocketEndpoint,
    mode: LaunchMode,
    provider: &dyn EngineProvider,
    daemonizer: &dyn Daemonizer,
    registry: &Registry,
) -> Result<(), LaunchError> {
    info!(
        target: PROCESS_TARGET,
        session = %name,
        endpoint = %endpoint,
        ?mode,
        "starting session daemon"
    );

    // One live daemon per session: a surviving registry record means the
    // session is taken. Stale records are pruned by the lookup itself.
    if let Some(record) = registry.resolve(name)? {
        return Err(LaunchError::AlreadyRunning {
            name: name.clone(),
            pid: record.pid,
        });
    }
    endpoint.prepare_filesystem()?;

    // Detach before acquiring the engine so the browser is owned by the
    // final child and the recorded pid is the one serving the socket.
    if matches!(mode, LaunchMode::Background) {
        daemonizer.daemonize()?;
    }

    let engine = provider
        .open(&EngineOptions::default())
        .map_err(|source| LaunchError::Engine { source })?;
    let listener = SocketListener::bind(endpoint)?;
    let bound = listener.bound_endpoint();
    let record = SessionRecord {
        pid: process::id(),
        endpoint: bound,
    };
    if let Err(error) = registry.register(name, &record) {
        // Never leave a socket no client can discover through the registry.
        remove_unix_socket(endpoint);
        return Err(error.into());
    }

    let (shutdown_tx, shutdown_rx) = channel();
    let host = Arc::new(Mutex::new(SessionHost::new(engine)));
    let handler = Arc::new(SessionConnectionHandler::new(
        Arc::clone(&host),
        shutdown_tx.clone(),
    ));
    let handle = listener.start(handler)?;
    install_signal_watcher(shutdown_tx)?;

    let cause = await_shutdown(&shutdown_rx);
    info!(
        target: PROCESS_TARGET,
        session = %name,
        ?cause,
        "shutting session daemon down"
    );
    teardown(name, registry, &host, handle);
    Ok(())
}

fn await_shutdown(shutdown: &Receiver<ShutdownCause>) -> ShutdownCause {
    // All senders gone counts as a shutdown request.
    shutdown.recv().unwrap_or(ShutdownCause::SessionClosed)
}

fn remove_unix_socket(endpoint: &SocketEndpoint) {
    if let Some(path) = endpoint.unix_path()
        && let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: PROCESS_TARGET,
            path = %path,
            error = %error,
            "failed to remove socket after registration failure"
        );
    }
}

/// Releases resources in dependency order: engine, registry record, socket.
fn teardown(
    name: &SessionName,
    registry: &Registry,
    host: &Arc<Mutex<SessionHost>>,
    handle: ListenerHandle,
) {
    let mut guard = match host.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(error) = guard.shutdown_engine() {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "engine refused to close during teardown"
        );
    }
    drop(guard);

    if let Err(error) = registry.unregister(name) {
        warn!(
            target: PROCESS_TARGET,
            session = %name,
            error = %error,
            "failed to remove registry record during teardown"
        );
    }

    handle.shutdown();
    if let Err(error) = handle.join() {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "listener did not shut down cleanly"
        );
    }
}
