//! Executes decoded commands against the session engine.
//!
//! Every action in the catalogue maps to one engine call plus a response
//! payload. Faults become error responses and leave the session serviceable;
//! an unusable engine and the `close` command additionally schedule daemon
//! shutdown, signalled to the caller through [`DispatchOutcome`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use camino::Utf8PathBuf;
use serde_json::{Value, json};
use url::Url;

use drover_engine::{
    Button, Capture, CaptureFormat, CaptureRequest, ClickOptions, Engine, EngineError,
    EngineResult, ScrollRequest, TypeOptions, Viewport, WaitPolicy, WaitRequest, WaitState,
};
use drover_protocol::{Action, Command, ImageFormat, MouseButton, Response, ScrollDirection};

use crate::process::ShutdownCause;

/// Pixels scrolled when a direction is given without an amount.
const DEFAULT_SCROLL_PX: i64 = 400;

/// Schemes accepted verbatim; anything else gets an `https://` prefix.
const KNOWN_SCHEMES: &[&str] = &["http", "https", "file", "about", "data"];

/// Result of executing one command.
pub(crate) struct DispatchOutcome {
    /// Response to send back to the client.
    pub(crate) response: Response,
    /// Shutdown to schedule after the response has been written.
    pub(crate) shutdown: Option<ShutdownCause>,
}

struct Performed {
    data: Value,
    shutdown: Option<ShutdownCause>,
}

impl Performed {
    fn data(data: Value) -> Self {
        Self {
            data,
            shutdown: None,
        }
    }
}

pub(crate) fn execute(engine: &mut dyn Engine, command: &Command) -> DispatchOutcome {
    match perform(engine, &command.action) {
        Ok(performed) => DispatchOutcome {
            response: Response::success(command.id.clone(), performed.data),
            shutdown: performed.shutdown,
        },
        Err(error) => DispatchOutcome {
            shutdown: error.is_unusable().then_some(ShutdownCause::EngineUnusable),
            response: Response::failure(Some(command.id.clone()), error.to_string()),
        },
    }
}

fn perform(engine: &mut dyn Engine, action: &Action) -> EngineResult<Performed> {
    match action {
        Action::Navigate { url, wait_until } => {
            let target = normalise_url(url)?;
            let policy = wait_until.map(wait_policy).unwrap_or_default();
            let outcome = engine.navigate(&target, policy)?;
            Ok(Performed::data(json!({
                "url": outcome.final_url,
                "title": outcome.title,
            })))
        }
        Action::Click {
            selector,
            button,
            click_count,
            delay,
        } => {
            let options = ClickOptions {
                button: button.map(mouse_button).unwrap_or_default(),
                count: click_count.unwrap_or(1),
                delay_ms: *delay,
            };
            engine.click(selector, &options)?;
            Ok(Performed::data(json!({ "clicked": true })))
        }
        Action::Type {
            selector,
            text,
            delay,
            clear,
        } => {
            let options = TypeOptions {
                delay_ms: *delay,
                clear_first: clear.unwrap_or(false),
            };
            engine.type_text(selector, text, &options)?;
            Ok(Performed::data(json!({ "typed": true })))
        }
        Action::Press { key, selector } => {
            engine.press_key(key, selector.as_deref())?;
            Ok(Performed::data(json!({ "pressed": true })))
        }
        Action::Screenshot {
            path,
            full_page,
            selector,
            format,
            quality,
        } => {
            let request = CaptureRequest {
                full_page: full_page.unwrap_or(false),
                selector: selector.clone(),
                format: format.map(capture_format).unwrap_or_default(),
                quality: *quality,
                path: path.as_deref().map(Utf8PathBuf::from),
            };
            let capture = engine.capture_image(&request)?;
            Ok(Performed::data(match capture {
                Capture::File(written) => json!({ "path": written }),
                Capture::Bytes(bytes) => json!({ "base64": BASE64.encode(bytes) }),
            }))
        }
        Action::Snapshot => {
            let tree = engine.accessibility_tree(None)?;
            Ok(Performed::data(json!({ "snapshot": tree })))
        }
        Action::Evaluate { script, args } => {
            let script_args = args.clone().unwrap_or_default();
            let result = engine.evaluate_script(script, &script_args)?;
            Ok(Performed::data(json!({ "result": result })))
        }
        Action::Wait {
            selector,
            text,
            timeout,
            state,
        } => {
            // Text waits reuse the selector machinery via a text matcher.
            let target = selector
                .clone()
                .or_else(|| text.as_ref().map(|needle| format!("text={needle}")));
            let request = WaitRequest {
                selector: target,
                state: state.map(wait_state).unwrap_or_default(),
                timeout_ms: *timeout,
            };
            engine.wait_for(&request)?;
            Ok(Performed::data(json!({ "waited": true })))
        }
        Action::Scroll {
            selector,
            x,
            y,
            direction,
            amount,
        } => {
            let (dx, dy) = scroll_deltas(*direction, *amount, *x, *y);
            engine.scroll(&ScrollRequest {
                selector: selector.clone(),
                dx,
                dy,
            })?;
            Ok(Performed::data(json!({ "scrolled": true })))
        }
        Action::Select { selector, values } => {
            let selected = engine.select_option(selector, values)?;
            Ok(Performed::data(json!({ "selected": selected })))
        }
        Action::Hover { selector } => {
            engine.hover(selector)?;
            Ok(Performed::data(json!({ "hovered": true })))
        }
        Action::Content { selector } => {
            let html = engine.read_html(selector.as_deref())?;
            Ok(Performed::data(json!({ "html": html })))
        }
        Action::Close => {
            engine.close()?;
            Ok(Performed {
                data: json!({ "closed": true }),
                shutdown: Some(ShutdownCause::SessionClosed),
            })
        }
        Action::TabNew => {
            let index = engine.open_page()?;
            let total = engine.list_pages()?.len();
            Ok(Performed::data(json!({ "index": index, "total": total })))
        }
        Action::TabList => {
            let pages = engine.list_pages()?;
            let active = engine.active_page()?;
            let tabs: Vec<Value> = pages
                .iter()
                .enumerate()
                .map(|(index, page)| {
                    json!({
                        "index": index,
                        "url": page.url,
                        "title": page.title,
                        "active": index == active,
                    })
                })
                .collect();
            Ok(Performed::data(json!({ "tabs": tabs, "active": active })))
        }
        Action::TabSwitch { index } => {
            engine.switch_page(*index)?;
            let page = engine
                .list_pages()?
                .into_iter()
                .nth(*index)
                .ok_or_else(|| EngineError::fault(format!("no page at index {index}")))?;
            Ok(Performed::data(json!({
                "index": index,
                "url": page.url,
                "title": page.title,
            })))
        }
        Action::TabClose { index } => {
            let target = match index {
                Some(explicit) => *explicit,
                None => engine.active_page()?,
            };
            let remaining = engine.close_page(target)?;
            Ok(Performed {
                data: json!({ "closed": target, "remaining": remaining }),
                // Closing the last tab ends the session.
                shutdown: (remaining == 0).then_some(ShutdownCause::SessionClosed),
            })
        }
        Action::WindowNew { viewport } => {
            let dimensions = viewport.map(|requested| Viewport {
                width: requested.width,
                height: requested.height,
            });
            let index = engine.open_window(dimensions)?;
            let total = engine.list_pages()?.len();
            Ok(Performed::data(json!({ "index": index, "total": total })))
        }
    }
}

/// Parses a navigation target, defaulting bare hosts to `https://`.
fn normalise_url(raw: &str) -> EngineResult<Url> {
    if let Ok(url) = Url::parse(raw)
        && KNOWN_SCHEMES.contains(&url.scheme())
    {
        return Ok(url);
    }
    Url::parse(&format!("https://{raw}"))
        .map_err(|error| EngineError::fault(format!("cannot navigate to '{raw}': {error}")))
}

fn scroll_deltas(
    direction: Option<ScrollDirection>,
    amount: Option<u32>,
    x: Option<i64>,
    y: Option<i64>,
) -> (i64, i64) {
    match direction {
        Some(direction) => {
            let magnitude = amount.map_or(DEFAULT_SCROLL_PX, i64::from);
            match direction {
                ScrollDirection::Up => (0, -magnitude),
                ScrollDirection::Down => (0, magnitude),
                ScrollDirection::Left => (-magnitude, 0),
                ScrollDirection::Right => (magnitude, 0),
            }
        }
        None => (x.unwrap_or(0), y.unwrap_or(0)),
    }
}

fn wait_policy(value: drover_protocol::WaitUntil) -> WaitPolicy {
    match value {
        drover_protocol::WaitUntil::Load => WaitPolicy::Load,
        drover_protocol::WaitUntil::Domcontentloaded => WaitPolicy::DomContentLoaded,
        drover_protocol::WaitUntil::Networkidle => WaitPolicy::NetworkIdle,
    }
}

fn mouse_button(value: MouseButton) -> Button {
    match value {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
    }
}

fn capture_format(value: ImageFormat) -> CaptureFormat {
    match value {
        ImageFormat::Png => CaptureFormat::Png,
        ImageFormat::Jpeg => CaptureFormat::Jpeg,
    }
}

fn wait_state(value: drover_protocol::WaitState) -> WaitState {
    match value {
        drover_protocol::WaitState::Attached => WaitState::Attached,
        drover_protocol::WaitState::Detached => WaitState::Detached,
        drover_protocol::WaitState::Visible => WaitState::Visible,
        drover_protocol::WaitState::Hidden => WaitState::Hidden,
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;
    use drover_engine::StubEngine;
    use rstest::rstest;

    fn command(action: Action) -> Command {
        Command {
            id: "t-1".to_owned(),
            action,
        }
    }

    fn run(engine: &mut StubEngine, action: Action) -> DispatchOutcome {
        execute(engine, &command(action))
    }

    #[rstest]
    #[case::bare_host("example.com", "https://example.com/")]
    #[case::explicit_scheme("http://example.com", "http://example.com/")]
    #[case::with_path("example.com/docs", "https://example.com/docs")]
    #[case::about_blank("about:blank", "about:blank")]
    fn navigate_defaults_missing_schemes(#[case] input: &str, #[case] expected: &str) {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Navigate {
                url: input.to_owned(),
                wait_until: None,
            },
        );
        assert_eq!(
            outcome.response.data().and_then(|data| data.get("url")),
            Some(&json!(expected))
        );
        assert!(outcome.shutdown.is_none());
    }

    #[test]
    fn text_wait_becomes_a_text_selector() {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Wait {
                selector: None,
                text: Some("missing label".to_owned()),
                timeout: Some(50),
                state: None,
            },
        );
        // The stub faults on "missing", proving the text matcher reached it.
        assert!(!outcome.response.is_success());
        assert!(outcome.shutdown.is_none());
    }

    #[rstest]
    #[case::down_defaults(Some(ScrollDirection::Down), None, (0, 400))]
    #[case::up_with_amount(Some(ScrollDirection::Up), Some(120), (0, -120))]
    #[case::left(Some(ScrollDirection::Left), Some(10), (-10, 0))]
    fn directions_translate_to_signed_deltas(
        #[case] direction: Option<ScrollDirection>,
        #[case] amount: Option<u32>,
        #[case] expected: (i64, i64),
    ) {
        assert_eq!(scroll_deltas(direction, amount, None, None), expected);
    }

    #[test]
    fn explicit_deltas_pass_through() {
        assert_eq!(scroll_deltas(None, None, Some(5), Some(-7)), (5, -7));
    }

    #[test]
    fn close_schedules_session_shutdown() {
        let mut engine = StubEngine::new();
        let outcome = run(&mut engine, Action::Close);
        assert!(outcome.response.is_success());
        assert_eq!(outcome.shutdown, Some(ShutdownCause::SessionClosed));
    }

    #[test]
    fn closing_the_last_tab_schedules_shutdown() {
        let mut engine = StubEngine::new();
        let outcome = run(&mut engine, Action::TabClose { index: None });
        assert_eq!(
            outcome.response.data().and_then(|data| data.get("remaining")),
            Some(&json!(0))
        );
        assert_eq!(outcome.shutdown, Some(ShutdownCause::SessionClosed));
    }

    #[test]
    fn closing_one_of_many_tabs_keeps_the_session() {
        let mut engine = StubEngine::new();
        run(&mut engine, Action::TabNew);
        let outcome = run(&mut engine, Action::TabClose { index: Some(0) });
        assert!(outcome.response.is_success());
        assert!(outcome.shutdown.is_none());
    }

    #[test]
    fn unusable_engine_schedules_shutdown() {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Click {
                selector: "#crash".to_owned(),
                button: None,
                click_count: None,
                delay: None,
            },
        );
        assert!(!outcome.response.is_success());
        assert_eq!(outcome.shutdown, Some(ShutdownCause::EngineUnusable));
    }

    #[test]
    fn faults_keep_the_session_serviceable() {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Hover {
                selector: "#missing".to_owned(),
            },
        );
        assert!(!outcome.response.is_success());
        assert!(outcome.shutdown.is_none());

        let next = run(
            &mut engine,
            Action::Hover {
                selector: "#present".to_owned(),
            },
        );
        assert!(next.response.is_success());
    }

    #[test]
    fn tab_list_reports_exactly_one_active_tab() {
        let mut engine = StubEngine::new();
        run(&mut engine, Action::TabNew);
        run(&mut engine, Action::TabNew);
        let outcome = run(&mut engine, Action::TabList);
        let data = outcome.response.data().expect("tab_list data");
        let tabs = data.get("tabs").and_then(Value::as_array).expect("tabs");
        assert_eq!(tabs.len(), 3);
        assert_eq!(data.get("active"), Some(&json!(2)));
        // Each entry carries its own flag, and only the focused tab is set.
        let flagged: Vec<usize> = tabs
            .iter()
            .enumerate()
            .filter(|(_, tab)| tab.get("active") == Some(&json!(true)))
            .map(|(index, _)| index)
            .collect();
        assert_eq!(flagged, vec![2]);
    }

    #[test]
    fn screenshot_without_path_returns_base64() {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Screenshot {
                path: None,
                full_page: None,
                selector: None,
                format: None,
                quality: None,
            },
        );
        let data = outcome.response.data().expect("screenshot data");
        let encoded = data
            .get("base64")
            .and_then(Value::as_str)
            .expect("base64 payload");
        let bytes = BASE64.decode(encoded).expect("valid base64");
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn screenshot_with_path_writes_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("page.png");
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Screenshot {
                path: Some(path.to_str().expect("utf8 path").to_owned()),
                full_page: None,
                selector: None,
                format: None,
                quality: None,
            },
        );
        assert!(outcome.response.is_success());
        assert!(path.exists());
    }

    #[test]
    fn evaluate_returns_the_script_result() {
        let mut engine = StubEngine::new();
        let outcome = run(
            &mut engine,
            Action::Evaluate {
                script: "args[0] * 2".to_owned(),
                args: Some(vec![json!(21)]),
            },
        );
        assert_eq!(
            outcome.response.data().and_then(|data| data.get("result")),
            Some(&json!(21))
        );
    }
}
