//! Automation capability contract for drover session daemons.
//!
//! The daemon treats the browser engine as an opaque collaborator behind the
//! [`Engine`] trait: every operation the dispatcher needs, each fallible with
//! an [`EngineError`]. Engines are acquired through the [`EngineProvider`]
//! seam so the daemon runtime can be assembled with a real browser driver or
//! with the in-memory [`StubEngine`] interchangeably.
//!
//! The stub engine models pages, navigation, and timed waits faithfully
//! enough to exercise the full protocol stack; a real driver replaces it at
//! the provider seam without touching the daemon.

mod contract;
mod stub;
mod types;

pub use contract::{Engine, EngineError, EngineProvider, EngineResult};
pub use stub::{StubEngine, StubEngineProvider};
pub use types::{
    Button, Capture, CaptureFormat, CaptureRequest, ClickOptions, EngineOptions,
    NavigationOutcome, PageInfo, ScrollRequest, TypeOptions, Viewport, WaitPolicy, WaitRequest,
    WaitState,
};
