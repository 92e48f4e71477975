//! JSONL command dispatch for the session daemon.
//!
//! Clients send a single request line containing a correlation id and a
//! tagged action:
//!
//! ```json
//! {"id":"req-1","action":"navigate","url":"example.com"}
//! ```
//!
//! The daemon answers with exactly one response line carrying the same id:
//!
//! ```json
//! {"id":"req-1","success":true,"data":{"url":"https://example.com/","title":"example.com"}}
//! ```
//!
//! Commands execute one at a time under the session gate, in arrival order.

mod actions;
mod handler;

pub(crate) use self::handler::SessionConnectionHandler;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
