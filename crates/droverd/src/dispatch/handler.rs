//! Connection handler that reads and answers one JSONL command.
//!
//! Each connection carries exactly one request line. The handler decodes it,
//! executes the command under the session gate, writes the single response,
//! and only then schedules any shutdown the command triggered. The response
//! is written first so clients observe the acknowledgement even when the
//! command ends the session.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, mpsc::Sender};

use tracing::{debug, warn};

use drover_protocol::{Response, decode_command, encode_response};

use crate::process::ShutdownCause;
use crate::session::SessionHost;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::{DISPATCH_TARGET, actions};

/// Maximum size of a single request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Connection handler dispatching commands against the session engine.
pub(crate) struct SessionConnectionHandler {
    host: Arc<Mutex<SessionHost>>,
    shutdown: Sender<ShutdownCause>,
}

impl SessionConnectionHandler {
    pub(crate) fn new(host: Arc<Mutex<SessionHost>>, shutdown: Sender<ShutdownCause>) -> Self {
        Self { host, shutdown }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        let line = match read_request_line(&mut stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                write_response(&mut stream, &Response::failure(None, error.to_string()));
                return;
            }
        };

        let command = match decode_command(&line) {
            Ok(command) => command,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejected request");
                let id = error.id().map(str::to_owned);
                write_response(&mut stream, &Response::failure(id, error.to_string()));
                return;
            }
        };

        debug!(
            target: DISPATCH_TARGET,
            id = %command.id,
            action = command.action.tag(),
            "dispatching command"
        );

        let outcome = {
            let mut guard = match self.host.lock() {
                Ok(guard) => guard,
                // A panicked holder cannot have left partial state: the gate
                // wraps whole commands. Continue with the inner value.
                Err(poisoned) => poisoned.into_inner(),
            };
            actions::execute(guard.engine_mut(), &command)
        };

        write_response(&mut stream, &outcome.response);

        if let Some(cause) = outcome.shutdown {
            debug!(target: DISPATCH_TARGET, ?cause, "command scheduled shutdown");
            // The receiver disappears once teardown starts; that is fine.
            let _ = self.shutdown.send(cause);
        }
    }
}

impl ConnectionHandler for SessionConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }
}

fn write_response(stream: &mut ConnectionStream, response: &Response) {
    let encoded = match encode_response(response) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(target: DISPATCH_TARGET, %error, "failed to encode response");
            return;
        }
    };
    if let Err(error) = stream.write_all(&encoded).and_then(|()| stream.flush()) {
        warn!(target: DISPATCH_TARGET, %error, "failed to write response");
    }
}

/// Reads a bounded JSONL request line from the stream.
///
/// Returns `Ok(None)` when the client disconnects without sending data, and
/// `Ok(Some(bytes))` once a complete line (or EOF with partial data) arrives.
fn read_request_line(stream: &mut ConnectionStream) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(stream, &mut chunk)?;

        if bytes_read == 0 {
            return Ok(if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            });
        }

        if let Some(newline_pos) = chunk
            .get(..bytes_read)
            .and_then(|received| received.iter().position(|byte| *byte == b'\n'))
        {
            buffer.extend(chunk.iter().take(newline_pos + 1));
            enforce_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend(chunk.iter().take(bytes_read));
        enforce_limit(buffer.len())?;
    }
}

fn read_with_retry(stream: &mut ConnectionStream, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_limit(size: usize) -> io::Result<()> {
    if size > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(())
}
