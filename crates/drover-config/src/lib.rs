//! Shared configuration for the drover client and daemon.
//!
//! Both binaries must agree on where a session's transport endpoint lives,
//! which directory holds registry records, and how a session name is chosen
//! when the caller does not supply one. This crate centralises those
//! decisions so the client connector and the daemon host never drift apart.

mod defaults;
mod logging;
mod session;
mod socket;

pub use defaults::{DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, runtime_directory};
pub use logging::LogFormat;
pub use session::{SESSION_ENV_VAR, SessionName, SessionNameError, SessionPaths};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};
