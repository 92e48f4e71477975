//! Persisted session registry.
//!
//! One JSON record per session name maps the name to the daemon's transport
//! endpoint and owning process id. Records live in the shared runtime
//! directory and are the only cross-process mutable state in the system, so
//! every write goes through an atomic rename-into-place: a concurrent
//! resolver never observes a half-written record.
//!
//! Liveness is a zero-cost existence probe (signal 0), not a handshake; a
//! record whose pid is gone is stale and is deleted on sight.

mod liveness;
mod store;

pub use liveness::process_alive;
pub use store::{Registry, RegistryError, SessionRecord};
