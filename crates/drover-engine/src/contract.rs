//! The engine trait and its error surface.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::types::{
    Capture, CaptureRequest, ClickOptions, EngineOptions, NavigationOutcome, PageInfo,
    ScrollRequest, TypeOptions, Viewport, WaitPolicy, WaitRequest,
};

/// Convenience alias for fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures raised by the automation capability.
///
/// The distinction matters to the daemon: a [`EngineError::Fault`] leaves the
/// session serviceable, while [`EngineError::Unusable`] means the capability
/// itself is gone and the daemon must terminate rather than accept commands
/// it cannot serve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// One operation failed; the engine remains serviceable.
    #[error("{message}")]
    Fault {
        /// Human-readable description.
        message: String,
    },
    /// The capability itself became unusable (for example the browser
    /// process died).
    #[error("engine unusable: {message}")]
    Unusable {
        /// Human-readable description.
        message: String,
    },
}

impl EngineError {
    /// Builds a recoverable operation fault.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Builds an unrecoverable capability failure.
    pub fn unusable(message: impl Into<String>) -> Self {
        Self::Unusable {
            message: message.into(),
        }
    }

    /// True when the capability can no longer serve any command.
    #[must_use]
    pub const fn is_unusable(&self) -> bool {
        matches!(self, Self::Unusable { .. })
    }
}

/// The automation capability operation set.
///
/// One engine instance owns one browser plus isolation context and its page
/// set. Every method may fail with an engine-specific fault; callers convert
/// those uniformly into error responses. Implementations are not expected to
/// be thread safe: the daemon serialises access behind its session gate.
pub trait Engine: Send {
    /// Navigates the active page and reports where it settled.
    fn navigate(&mut self, url: &Url, wait: WaitPolicy) -> EngineResult<NavigationOutcome>;

    /// Clicks the element matched by the selector.
    fn click(&mut self, selector: &str, options: &ClickOptions) -> EngineResult<()>;

    /// Types text into the element matched by the selector.
    fn type_text(&mut self, selector: &str, text: &str, options: &TypeOptions) -> EngineResult<()>;

    /// Presses a key, optionally after focusing the selector.
    fn press_key(&mut self, key: &str, selector: Option<&str>) -> EngineResult<()>;

    /// Captures an image of the page or a matched element.
    fn capture_image(&mut self, request: &CaptureRequest) -> EngineResult<Capture>;

    /// Renders the accessibility tree rooted at the selector, or the whole
    /// document when absent.
    fn accessibility_tree(&mut self, root: Option<&str>) -> EngineResult<String>;

    /// Evaluates a script in the active page.
    fn evaluate_script(&mut self, source: &str, args: &[Value]) -> EngineResult<Value>;

    /// Waits for a selector state or, without a selector, a plain delay.
    fn wait_for(&mut self, request: &WaitRequest) -> EngineResult<()>;

    /// Scrolls the document or a matched element.
    fn scroll(&mut self, request: &ScrollRequest) -> EngineResult<()>;

    /// Selects option values; returns the values actually selected.
    fn select_option(&mut self, selector: &str, values: &[String]) -> EngineResult<Vec<String>>;

    /// Hovers the element matched by the selector.
    fn hover(&mut self, selector: &str) -> EngineResult<()>;

    /// Reads the HTML of the page or a matched element.
    fn read_html(&mut self, selector: Option<&str>) -> EngineResult<String>;

    /// Lists open pages in order.
    fn list_pages(&self) -> EngineResult<Vec<PageInfo>>;

    /// Index of the currently active page.
    fn active_page(&self) -> EngineResult<usize>;

    /// Opens a new page and returns its index.
    fn open_page(&mut self) -> EngineResult<usize>;

    /// Makes the page at the index current.
    fn switch_page(&mut self, index: usize) -> EngineResult<()>;

    /// Closes the page at the index and returns the remaining count.
    fn close_page(&mut self, index: usize) -> EngineResult<usize>;

    /// Opens a new window and returns the index of its page.
    fn open_window(&mut self, viewport: Option<Viewport>) -> EngineResult<usize>;

    /// Releases the browser and all its pages.
    fn close(&mut self) -> EngineResult<()>;
}

/// Seam through which the daemon acquires its engine.
pub trait EngineProvider: Send + Sync {
    /// Opens a fresh engine with one initial page.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the capability cannot be acquired.
    fn open(&self, options: &EngineOptions) -> EngineResult<Box<dyn Engine>>;
}
