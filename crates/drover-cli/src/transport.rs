//! Socket transport helpers for the Drover CLI.
//!
//! Wraps connections to daemon endpoints in a uniform [`Connection`] type so
//! the connector logic can remain transport agnostic. All connects are
//! bounded by [`CONNECTION_TIMEOUT`] so a wedged daemon cannot hang the CLI.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use drover_config::SocketEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::errors::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

pub(crate) fn connect(endpoint: &SocketEndpoint) -> Result<Connection, AppError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => connect_tcp(endpoint, host, *port),
        SocketEndpoint::Unix { .. } => {
            #[cfg(unix)]
            {
                // std's UnixStream has no connect timeout, so go through
                // socket2 for a bounded connect.
                connect_unix(endpoint)
            }

            #[cfg(not(unix))]
            {
                Err(AppError::UnsupportedUnixTransport(endpoint.to_string()))
            }
        }
    }
}

fn connect_tcp(
    endpoint: &SocketEndpoint,
    host: &str,
    port: u16,
) -> Result<Connection, AppError> {
    let address = (host, port)
        .to_socket_addrs()
        .and_then(|mut addrs| {
            // Prefer IPv4 so loopback resolution matches the daemon's bind.
            let mut fallback = None;
            addrs
                .find(|addr| {
                    if matches!(addr, SocketAddr::V6(_)) && fallback.is_none() {
                        fallback = Some(*addr);
                    }
                    matches!(addr, SocketAddr::V4(_))
                })
                .or(fallback)
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
                })
        })
        .map_err(|source| AppError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
        .map(Connection::Tcp)
        .map_err(|source| AppError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })
}

#[cfg(unix)]
fn connect_unix(endpoint: &SocketEndpoint) -> Result<Connection, AppError> {
    let attempt = || -> io::Result<Connection> {
        let path = endpoint
            .unix_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a unix endpoint"))?;
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        let address = SockAddr::unix(path.as_str())?;
        socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
        Ok(Connection::Unix(socket.into()))
    };
    attempt().map_err(|source| AppError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}
