//! Session state owned by the daemon.

use drover_engine::{Engine, EngineResult};

/// One daemon owns exactly one session: a single engine instance whose
/// command stream is serialised by the mutex around this type.
pub(crate) struct SessionHost {
    engine: Box<dyn Engine>,
    engine_closed: bool,
}

impl SessionHost {
    pub(crate) fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            engine_closed: false,
        }
    }

    pub(crate) fn engine_mut(&mut self) -> &mut dyn Engine {
        self.engine.as_mut()
    }

    /// Releases the engine. Safe to call more than once; teardown runs both
    /// from the `close` command and from the daemon exit path.
    pub(crate) fn shutdown_engine(&mut self) -> EngineResult<()> {
        if self.engine_closed {
            return Ok(());
        }
        self.engine_closed = true;
        self.engine.close()
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use drover_engine::StubEngine;

    #[test]
    fn shutdown_is_idempotent() {
        let mut host = SessionHost::new(Box::new(StubEngine::new()));
        host.shutdown_engine().expect("first shutdown");
        host.shutdown_engine().expect("second shutdown");
    }
}
