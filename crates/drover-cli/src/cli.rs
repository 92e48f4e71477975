//! CLI argument definitions for the Drover browser-automation tool.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format selection for command responses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit the raw JSON payload from the daemon.
    Json,
}

/// Command-line interface for driving a browser session.
#[derive(Parser, Debug)]
#[command(name = "drover", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Session to address; each session is one isolated browser.
    #[arg(long, global = true, env = "DROVER_SESSION")]
    pub(crate) session: Option<String>,
    /// Controls how responses are rendered.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// One subcommand per daemon action, plus local registry queries.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Navigates the session to a URL.
    Navigate {
        /// Destination URL; a bare host defaults to https.
        url: String,
        /// Navigation completion policy.
        #[arg(long, value_enum)]
        wait_until: Option<WaitUntilArg>,
    },
    /// Clicks the element matched by a selector.
    Click {
        /// Element selector.
        selector: String,
        /// Mouse button to press.
        #[arg(long, value_enum)]
        button: Option<MouseButtonArg>,
        /// Number of consecutive clicks.
        #[arg(long)]
        click_count: Option<u32>,
        /// Delay between press and release in milliseconds.
        #[arg(long)]
        delay: Option<u64>,
    },
    /// Types text into the element matched by a selector.
    Type {
        /// Element selector.
        selector: String,
        /// Text to type.
        text: String,
        /// Delay between keystrokes in milliseconds.
        #[arg(long)]
        delay: Option<u64>,
        /// Clears the field before typing.
        #[arg(long)]
        clear: bool,
    },
    /// Presses a single key, optionally after focusing a selector.
    Press {
        /// Key name, for example `Enter`.
        key: String,
        /// Element to focus before the key press.
        #[arg(long)]
        selector: Option<String>,
    },
    /// Captures an image of the page or an element.
    Screenshot {
        /// Destination file path; omitted, the image is returned inline.
        #[arg(long)]
        path: Option<String>,
        /// Captures the full document height instead of the viewport.
        #[arg(long)]
        full_page: bool,
        /// Restricts the capture to the matched element.
        #[arg(long)]
        selector: Option<String>,
        /// Output image format.
        #[arg(long, value_enum)]
        format: Option<ImageFormatArg>,
        /// JPEG quality (0-100); only valid with the jpeg format.
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Prints the accessibility tree of the active page.
    Snapshot,
    /// Evaluates a script in the active page.
    Evaluate {
        /// Script source to evaluate.
        script: String,
        /// Positional JSON arguments passed to the script.
        #[arg(long = "arg", value_name = "JSON")]
        args: Vec<String>,
    },
    /// Waits for a selector, matched text, or a plain delay.
    Wait {
        /// Selector to wait for.
        #[arg(long, conflicts_with = "text")]
        selector: Option<String>,
        /// Visible text to wait for.
        #[arg(long)]
        text: Option<String>,
        /// Bound on the wait in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Element state to wait for.
        #[arg(long, value_enum)]
        state: Option<WaitStateArg>,
    },
    /// Scrolls the document or a matched element.
    Scroll {
        /// Element to scroll; the whole document when omitted.
        #[arg(long)]
        selector: Option<String>,
        /// Explicit horizontal delta in pixels.
        #[arg(long, conflicts_with = "direction")]
        x: Option<i64>,
        /// Explicit vertical delta in pixels.
        #[arg(long, conflicts_with = "direction")]
        y: Option<i64>,
        /// Named direction translated to a signed delta.
        #[arg(long, value_enum)]
        direction: Option<ScrollDirectionArg>,
        /// Magnitude in pixels applied to the direction.
        #[arg(long, requires = "direction")]
        amount: Option<u32>,
    },
    /// Selects option values in a `<select>` element.
    Select {
        /// Element selector.
        selector: String,
        /// Option values to select.
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Hovers the element matched by a selector.
    Hover {
        /// Element selector.
        selector: String,
    },
    /// Prints the HTML of the page or a matched element.
    Content {
        /// Element selector; the whole document when omitted.
        #[arg(long)]
        selector: Option<String>,
    },
    /// Shuts the session daemon down.
    Close,
    /// Tab management.
    Tab {
        #[command(subcommand)]
        action: TabAction,
    },
    /// Window management.
    Window {
        #[command(subcommand)]
        action: WindowAction,
    },
    /// Lists live sessions from the local registry.
    Sessions,
}

/// Tab subcommands.
#[derive(Subcommand, Debug, Clone, Copy)]
pub(crate) enum TabAction {
    /// Opens a new tab and makes it active.
    New,
    /// Lists open tabs and the active index.
    List,
    /// Switches the active tab.
    Switch {
        /// Zero-based tab index.
        index: usize,
    },
    /// Closes a tab, defaulting to the active one.
    Close {
        /// Zero-based tab index.
        index: Option<usize>,
    },
}

/// Window subcommands.
#[derive(Subcommand, Debug, Clone, Copy)]
pub(crate) enum WindowAction {
    /// Opens a new window.
    New {
        /// Viewport dimensions as WIDTHxHEIGHT, for example 1280x720.
        #[command(flatten)]
        viewport: ViewportArgs,
    },
}

/// Optional viewport dimensions; both or neither must be given.
#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct ViewportArgs {
    /// Viewport width in pixels.
    #[arg(long, requires = "height")]
    pub(crate) width: Option<u32>,
    /// Viewport height in pixels.
    #[arg(long, requires = "width")]
    pub(crate) height: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum WaitUntilArg {
    Load,
    Domcontentloaded,
    Networkidle,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum MouseButtonArg {
    Left,
    Right,
    Middle,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum ImageFormatArg {
    Png,
    Jpeg,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum WaitStateArg {
    Attached,
    Detached,
    Visible,
    Hidden,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum ScrollDirectionArg {
    Up,
    Down,
    Left,
    Right,
}
