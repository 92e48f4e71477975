//! Typed commands and the per-action field schema.
//!
//! The action catalogue is a closed sum type; the dispatcher matches it
//! exhaustively, so adding a tag without a handler fails at compile time.
//! Field-level constraints beyond JSON types live in [`Command::validate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;

/// Immutable command value: correlation id plus one tagged action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Caller-generated correlation token, unique per in-flight request.
    pub id: String,
    /// The requested operation and its parameters.
    #[serde(flatten)]
    pub action: Action,
}

/// Closed catalogue of operations a daemon accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Navigates the active page to a URL.
    Navigate {
        /// Destination URL; a missing scheme defaults to `https://`.
        url: String,
        /// Navigation completion policy.
        #[serde(rename = "waitUntil", skip_serializing_if = "Option::is_none")]
        wait_until: Option<WaitUntil>,
    },
    /// Clicks the element matched by a selector.
    Click {
        /// Element selector.
        selector: String,
        /// Mouse button to press.
        #[serde(skip_serializing_if = "Option::is_none")]
        button: Option<MouseButton>,
        /// Number of consecutive clicks.
        #[serde(rename = "clickCount", skip_serializing_if = "Option::is_none")]
        click_count: Option<u32>,
        /// Delay between press and release in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        delay: Option<u64>,
    },
    /// Types text into the element matched by a selector.
    #[serde(rename = "type")]
    Type {
        /// Element selector.
        selector: String,
        /// Text to type.
        text: String,
        /// Delay between keystrokes in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        delay: Option<u64>,
        /// Clears the field before typing when true.
        #[serde(skip_serializing_if = "Option::is_none")]
        clear: Option<bool>,
    },
    /// Presses a single key, optionally after focusing a selector.
    Press {
        /// Key name, for example `Enter`.
        key: String,
        /// Element to focus before the key press.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    /// Captures an image of the page or an element.
    Screenshot {
        /// Destination file path; when absent the bytes are returned inline.
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        /// Captures the full document height instead of the viewport.
        #[serde(rename = "fullPage", skip_serializing_if = "Option::is_none")]
        full_page: Option<bool>,
        /// Restricts the capture to the matched element.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Output image format.
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<ImageFormat>,
        /// JPEG quality (0–100); only valid with the `jpeg` format.
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
    /// Reads the accessibility tree of the active page.
    Snapshot,
    /// Evaluates a script in the active page.
    Evaluate {
        /// Script source to evaluate.
        script: String,
        /// Positional arguments passed to the script.
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<Vec<Value>>,
    },
    /// Waits for a selector, matched text, or a plain delay.
    Wait {
        /// Selector to wait for.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Visible text to wait for; translated to a text-match selector.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Bound on the wait in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        /// Element state to wait for.
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<WaitState>,
    },
    /// Scrolls the document or a matched element.
    Scroll {
        /// Element to scroll; the whole document when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Explicit horizontal delta in pixels.
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<i64>,
        /// Explicit vertical delta in pixels.
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<i64>,
        /// Named direction translated to a signed delta.
        #[serde(skip_serializing_if = "Option::is_none")]
        direction: Option<ScrollDirection>,
        /// Magnitude in pixels applied to `direction`.
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<u32>,
    },
    /// Selects option values in a `<select>` element.
    Select {
        /// Element selector.
        selector: String,
        /// Option values to select.
        values: Vec<String>,
    },
    /// Hovers the element matched by a selector.
    Hover {
        /// Element selector.
        selector: String,
    },
    /// Reads the HTML of the page or a matched element.
    Content {
        /// Element selector; the whole document when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    /// Shuts the session daemon down.
    Close,
    /// Opens a new tab.
    TabNew,
    /// Lists open tabs and the active index.
    TabList,
    /// Switches the active tab.
    TabSwitch {
        /// Zero-based tab index.
        index: usize,
    },
    /// Closes a tab, defaulting to the active one.
    TabClose {
        /// Zero-based tab index; the active tab when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Opens a new window.
    WindowNew {
        /// Viewport dimensions for the new window.
        #[serde(skip_serializing_if = "Option::is_none")]
        viewport: Option<Viewport>,
    },
}

/// Navigation completion policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// Wait for the `load` event.
    Load,
    /// Wait for `DOMContentLoaded`.
    Domcontentloaded,
    /// Wait for the network to go idle.
    Networkidle,
}

/// Mouse buttons accepted by `click`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle button.
    Middle,
}

/// Output formats accepted by `screenshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG; accepts a `quality` value.
    Jpeg,
}

/// Element states accepted by `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    /// Present in the DOM.
    Attached,
    /// Removed from the DOM.
    Detached,
    /// Present and visible.
    Visible,
    /// Absent or invisible.
    Hidden,
}

/// Named scroll directions accepted by `scroll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Scroll towards the top of the document.
    Up,
    /// Scroll towards the bottom of the document.
    Down,
    /// Scroll towards the left edge.
    Left,
    /// Scroll towards the right edge.
    Right,
}

/// Viewport dimensions for `window_new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Field schema for one action tag.
pub(crate) struct ActionSchema {
    pub(crate) tag: &'static str,
    pub(crate) required: &'static [&'static str],
    pub(crate) optional: &'static [&'static str],
}

impl ActionSchema {
    pub(crate) fn lookup(tag: &str) -> Option<&'static Self> {
        SCHEMAS.iter().find(|schema| schema.tag == tag)
    }

    pub(crate) fn allows(&self, field: &str) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

const SCHEMAS: &[ActionSchema] = &[
    ActionSchema {
        tag: "navigate",
        required: &["url"],
        optional: &["waitUntil"],
    },
    ActionSchema {
        tag: "click",
        required: &["selector"],
        optional: &["button", "clickCount", "delay"],
    },
    ActionSchema {
        tag: "type",
        required: &["selector", "text"],
        optional: &["delay", "clear"],
    },
    ActionSchema {
        tag: "press",
        required: &["key"],
        optional: &["selector"],
    },
    ActionSchema {
        tag: "screenshot",
        required: &[],
        optional: &["path", "fullPage", "selector", "format", "quality"],
    },
    ActionSchema {
        tag: "snapshot",
        required: &[],
        optional: &[],
    },
    ActionSchema {
        tag: "evaluate",
        required: &["script"],
        optional: &["args"],
    },
    ActionSchema {
        tag: "wait",
        required: &[],
        optional: &["selector", "text", "timeout", "state"],
    },
    ActionSchema {
        tag: "scroll",
        required: &[],
        optional: &["selector", "x", "y", "direction", "amount"],
    },
    ActionSchema {
        tag: "select",
        required: &["selector", "values"],
        optional: &[],
    },
    ActionSchema {
        tag: "hover",
        required: &["selector"],
        optional: &[],
    },
    ActionSchema {
        tag: "content",
        required: &[],
        optional: &["selector"],
    },
    ActionSchema {
        tag: "close",
        required: &[],
        optional: &[],
    },
    ActionSchema {
        tag: "tab_new",
        required: &[],
        optional: &[],
    },
    ActionSchema {
        tag: "tab_list",
        required: &[],
        optional: &[],
    },
    ActionSchema {
        tag: "tab_switch",
        required: &["index"],
        optional: &[],
    },
    ActionSchema {
        tag: "tab_close",
        required: &[],
        optional: &["index"],
    },
    ActionSchema {
        tag: "window_new",
        required: &[],
        optional: &["viewport"],
    },
];

impl Command {
    /// Checks value constraints beyond JSON types.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Validation`] naming the first violated field.
    pub fn validate(&self) -> Result<(), DecodeError> {
        self.action
            .validate()
            .map_err(|(field, constraint)| {
                DecodeError::validation(Some(self.id.clone()), field, constraint)
            })
    }
}

type Violation = (&'static str, &'static str);

impl Action {
    /// Canonical tag for this action.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Press { .. } => "press",
            Self::Screenshot { .. } => "screenshot",
            Self::Snapshot => "snapshot",
            Self::Evaluate { .. } => "evaluate",
            Self::Wait { .. } => "wait",
            Self::Scroll { .. } => "scroll",
            Self::Select { .. } => "select",
            Self::Hover { .. } => "hover",
            Self::Content { .. } => "content",
            Self::Close => "close",
            Self::TabNew => "tab_new",
            Self::TabList => "tab_list",
            Self::TabSwitch { .. } => "tab_switch",
            Self::TabClose { .. } => "tab_close",
            Self::WindowNew { .. } => "window_new",
        }
    }

    fn validate(&self) -> Result<(), Violation> {
        match self {
            Self::Navigate { url, .. } => require_non_empty("url", url),
            Self::Click {
                selector,
                click_count,
                ..
            } => {
                require_non_empty("selector", selector)?;
                if click_count.is_some_and(|count| count == 0) {
                    return Err(("clickCount", "must be at least 1"));
                }
                Ok(())
            }
            Self::Type { selector, .. } => require_non_empty("selector", selector),
            Self::Press { key, selector } => {
                require_non_empty("key", key)?;
                optional_non_empty("selector", selector.as_deref())
            }
            Self::Screenshot {
                path,
                selector,
                format,
                quality,
                ..
            } => {
                optional_non_empty("path", path.as_deref())?;
                optional_non_empty("selector", selector.as_deref())?;
                if let Some(value) = quality {
                    if *value > 100 {
                        return Err(("quality", "must be between 0 and 100"));
                    }
                    if !matches!(format, Some(ImageFormat::Jpeg)) {
                        return Err(("quality", "only valid with the jpeg format"));
                    }
                }
                Ok(())
            }
            Self::Evaluate { script, .. } => require_non_empty("script", script),
            Self::Wait {
                selector,
                text,
                timeout,
                ..
            } => {
                if selector.is_some() && text.is_some() {
                    return Err(("text", "cannot be combined with selector"));
                }
                optional_non_empty("selector", selector.as_deref())?;
                optional_non_empty("text", text.as_deref())?;
                if timeout.is_some_and(|value| value == 0) {
                    return Err(("timeout", "must be positive"));
                }
                Ok(())
            }
            Self::Scroll {
                selector,
                x,
                y,
                direction,
                amount,
            } => {
                optional_non_empty("selector", selector.as_deref())?;
                if direction.is_some() && (x.is_some() || y.is_some()) {
                    return Err(("direction", "cannot be combined with explicit deltas"));
                }
                if amount.is_some() && direction.is_none() {
                    return Err(("amount", "requires a direction"));
                }
                Ok(())
            }
            Self::Select { selector, values } => {
                require_non_empty("selector", selector)?;
                if values.is_empty() {
                    return Err(("values", "must not be empty"));
                }
                Ok(())
            }
            Self::Hover { selector } => require_non_empty("selector", selector),
            Self::Content { selector } => optional_non_empty("selector", selector.as_deref()),
            Self::WindowNew { viewport } => {
                if let Some(Viewport { width, height }) = viewport
                    && (*width == 0 || *height == 0)
                {
                    return Err(("viewport", "dimensions must be positive"));
                }
                Ok(())
            }
            Self::Snapshot
            | Self::Close
            | Self::TabNew
            | Self::TabList
            | Self::TabSwitch { .. }
            | Self::TabClose { .. } => Ok(()),
        }
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        return Err((field, "must not be empty"));
    }
    Ok(())
}

fn optional_non_empty(field: &'static str, value: Option<&str>) -> Result<(), Violation> {
    match value {
        Some(text) => require_non_empty(field, text),
        None => Ok(()),
    }
}
