//! Socket listener for the session daemon endpoint.
//!
//! The transport module binds the session socket and accepts connections in a
//! background thread. Accepted streams are handed to a [`ConnectionHandler`];
//! command parsing and execution live in the dispatch module.

mod errors;
mod handler;
mod listener;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
