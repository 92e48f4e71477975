//! Value types crossing the capability boundary.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Metadata describing one open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Current URL of the page.
    pub url: String,
    /// Current title of the page.
    pub title: String,
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Result of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    /// URL the page settled on after redirects.
    pub final_url: String,
    /// Title of the loaded document.
    pub title: String,
}

/// Navigation completion policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait for the `load` event.
    #[default]
    Load,
    /// Wait for `DOMContentLoaded`.
    DomContentLoaded,
    /// Wait for the network to go idle.
    NetworkIdle,
}

/// Mouse buttons the engine can press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Button {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Middle button.
    Middle,
}

/// Options applied to a click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Button to press.
    pub button: Button,
    /// Number of consecutive clicks; zero is treated as one.
    pub count: u32,
    /// Delay between press and release in milliseconds.
    pub delay_ms: Option<u64>,
}

/// Options applied to typed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOptions {
    /// Delay between keystrokes in milliseconds.
    pub delay_ms: Option<u64>,
    /// Clears the field before typing when true.
    pub clear_first: bool,
}

/// Image formats the engine can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// Lossy JPEG with an optional quality setting.
    Jpeg,
}

/// Parameters of an image capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Captures the full document height instead of the viewport.
    pub full_page: bool,
    /// Restricts the capture to the matched element.
    pub selector: Option<String>,
    /// Output format.
    pub format: CaptureFormat,
    /// JPEG quality (0–100).
    pub quality: Option<u8>,
    /// Destination path; when absent the bytes are returned inline.
    pub path: Option<Utf8PathBuf>,
}

/// Result of an image capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// The engine wrote the image to this path.
    File(Utf8PathBuf),
    /// The engine returned the encoded image inline.
    Bytes(Vec<u8>),
}

/// Element states a wait can target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitState {
    /// Present in the DOM.
    Attached,
    /// Removed from the DOM.
    Detached,
    /// Present and visible.
    #[default]
    Visible,
    /// Absent or invisible.
    Hidden,
}

/// Parameters of a wait operation.
///
/// With no selector the wait is a plain delay bounded by `timeout_ms`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitRequest {
    /// Selector to wait for.
    pub selector: Option<String>,
    /// State the element must reach.
    pub state: WaitState,
    /// Bound on the wait in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Parameters of a scroll operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Element to scroll; the whole document when absent.
    pub selector: Option<String>,
    /// Horizontal delta in pixels.
    pub dx: i64,
    /// Vertical delta in pixels.
    pub dy: i64,
}

/// Options applied when acquiring an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Runs the browser without a visible window.
    pub headless: bool,
    /// Initial viewport dimensions.
    pub viewport: Option<Viewport>,
}
