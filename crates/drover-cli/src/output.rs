//! Rendering of daemon responses for terminals and pipelines.
//!
//! JSON output forwards the payload unchanged so scripts can parse it.
//! Human output picks a compact textual form for the payloads whose shape
//! is known and falls back to pretty-printed JSON for anything else.

use std::fmt::Write as _;

use serde_json::Value;

use crate::cli::OutputFormat;

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ResolvedOutputFormat {
    /// Compact text for interactive use.
    Human,
    /// Raw JSON payloads.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    pub(crate) fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

/// Renders a success payload in the resolved format.
///
/// The returned string always ends in a newline.
pub(crate) fn render_data(data: &Value, format: ResolvedOutputFormat) -> String {
    match format {
        ResolvedOutputFormat::Json => {
            let mut line = data.to_string();
            line.push('\n');
            line
        }
        ResolvedOutputFormat::Human => render_human(data),
    }
}

fn render_human(data: &Value) -> String {
    if let Some(rendered) = render_known_payload(data) {
        return rendered;
    }
    match serde_json::to_string_pretty(data) {
        Ok(mut pretty) => {
            pretty.push('\n');
            pretty
        }
        Err(_) => format!("{data}\n"),
    }
}

/// Compact text for the payload shapes the daemon is known to emit.
fn render_known_payload(data: &Value) -> Option<String> {
    let object = data.as_object()?;

    // Raw document content reads best unwrapped.
    if let Some(html) = object.get("html").and_then(Value::as_str) {
        return Some(terminated(html));
    }
    if let Some(snapshot) = object.get("snapshot").and_then(Value::as_str) {
        return Some(terminated(snapshot));
    }
    if let Some(path) = object.get("path").and_then(Value::as_str) {
        return Some(format!("saved {path}\n"));
    }
    if let Some(encoded) = object.get("base64").and_then(Value::as_str) {
        return Some(format!("captured image ({} base64 bytes)\n", encoded.len()));
    }
    if let Some(tabs) = object.get("tabs").and_then(Value::as_array) {
        let active = object.get("active").and_then(Value::as_u64);
        return Some(render_tab_list(tabs, active));
    }
    if let Some(url) = object.get("url").and_then(Value::as_str) {
        let title = object.get("title").and_then(Value::as_str).unwrap_or("");
        return Some(format!("{url}  {title}\n"));
    }
    if let Some(result) = object.get("result") {
        return Some(terminated(&result.to_string()));
    }
    None
}

fn render_tab_list(tabs: &[Value], active: Option<u64>) -> String {
    let active_index = active.and_then(|index| usize::try_from(index).ok());
    let mut rendered = String::new();
    for (index, tab) in tabs.iter().enumerate() {
        let marker = if active_index == Some(index) { "*" } else { " " };
        let url = tab.get("url").and_then(Value::as_str).unwrap_or("?");
        let title = tab.get("title").and_then(Value::as_str).unwrap_or("");
        let _ = writeln!(rendered, "{marker} {index}  {url}  {title}");
    }
    if rendered.is_empty() {
        rendered.push_str("no open tabs\n");
    }
    rendered
}

fn terminated(text: &str) -> String {
    let mut line = text.to_owned();
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}
