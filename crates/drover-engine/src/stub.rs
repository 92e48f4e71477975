//! In-memory engine used until a real browser driver is wired in.
//!
//! The stub models the observable surface the dispatcher depends on: an
//! ordered page set, per-page URL and title, timed waits, and deterministic
//! failures. Selectors containing `missing` fault the operation; selectors
//! containing `crash` render the engine unusable, which lets tests drive the
//! daemon's self-termination path.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::contract::{Engine, EngineError, EngineProvider, EngineResult};
use crate::types::{
    Capture, CaptureRequest, ClickOptions, EngineOptions, NavigationOutcome, PageInfo,
    ScrollRequest, TypeOptions, Viewport, WaitPolicy, WaitRequest,
};

const BLANK_URL: &str = "about:blank";
const BLANK_TITLE: &str = "";
const DEFAULT_WAIT_MS: u64 = 500;

// Minimal valid PNG signature; enough for byte-mode capture consumers.
const PNG_STUB: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Clone)]
struct StubPage {
    url: String,
    title: String,
}

impl StubPage {
    fn blank() -> Self {
        Self {
            url: BLANK_URL.to_owned(),
            title: BLANK_TITLE.to_owned(),
        }
    }
}

/// In-memory [`Engine`] implementation.
#[derive(Debug)]
pub struct StubEngine {
    pages: Vec<StubPage>,
    current: usize,
    closed: bool,
    operations: Vec<String>,
}

impl StubEngine {
    /// Opens a stub engine with one blank initial page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: vec![StubPage::blank()],
            current: 0,
            closed: false,
            operations: Vec::new(),
        }
    }

    /// Ordered log of the operations executed so far, for test assertions.
    #[must_use]
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::unusable("engine is closed"));
        }
        Ok(())
    }

    fn check_selector(&self, selector: &str) -> EngineResult<()> {
        if selector.contains("crash") {
            return Err(EngineError::unusable("browser process exited"));
        }
        if selector.contains("missing") {
            return Err(EngineError::fault(format!(
                "selector '{selector}' matched no element"
            )));
        }
        Ok(())
    }

    fn current_page(&self) -> EngineResult<&StubPage> {
        self.pages
            .get(self.current)
            .ok_or_else(|| EngineError::unusable("no pages remain"))
    }

    fn current_page_mut(&mut self) -> EngineResult<&mut StubPage> {
        self.pages
            .get_mut(self.current)
            .ok_or_else(|| EngineError::unusable("no pages remain"))
    }

    fn record(&mut self, operation: String) {
        self.operations.push(operation);
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn title_for(url: &Url) -> String {
    url.host_str().map_or_else(String::new, str::to_owned)
}

impl Engine for StubEngine {
    fn navigate(&mut self, url: &Url, _wait: WaitPolicy) -> EngineResult<NavigationOutcome> {
        self.ensure_open()?;
        let final_url = url.to_string();
        let title = title_for(url);
        let page = self.current_page_mut()?;
        page.url.clone_from(&final_url);
        page.title.clone_from(&title);
        self.record(format!("navigate {final_url}"));
        Ok(NavigationOutcome { final_url, title })
    }

    fn click(&mut self, selector: &str, options: &ClickOptions) -> EngineResult<()> {
        self.ensure_open()?;
        self.check_selector(selector)?;
        let count = options.count.max(1);
        self.record(format!("click {selector} x{count}"));
        Ok(())
    }

    fn type_text(&mut self, selector: &str, text: &str, _options: &TypeOptions) -> EngineResult<()> {
        self.ensure_open()?;
        self.check_selector(selector)?;
        self.record(format!("type {selector} <{text}>"));
        Ok(())
    }

    fn press_key(&mut self, key: &str, selector: Option<&str>) -> EngineResult<()> {
        self.ensure_open()?;
        if let Some(target) = selector {
            self.check_selector(target)?;
        }
        self.record(format!("press {key}"));
        Ok(())
    }

    fn capture_image(&mut self, request: &CaptureRequest) -> EngineResult<Capture> {
        self.ensure_open()?;
        if let Some(selector) = request.selector.as_deref() {
            self.check_selector(selector)?;
        }
        self.record("screenshot".to_owned());
        match &request.path {
            Some(path) => {
                std::fs::write(path.as_std_path(), PNG_STUB).map_err(|error| {
                    EngineError::fault(format!("failed to write capture to '{path}': {error}"))
                })?;
                Ok(Capture::File(path.clone()))
            }
            None => Ok(Capture::Bytes(PNG_STUB.to_vec())),
        }
    }

    fn accessibility_tree(&mut self, root: Option<&str>) -> EngineResult<String> {
        self.ensure_open()?;
        if let Some(selector) = root {
            self.check_selector(selector)?;
        }
        let page = self.current_page()?;
        Ok(format!(
            "document\n  title: {}\n  url: {}\n",
            page.title, page.url
        ))
    }

    fn evaluate_script(&mut self, source: &str, args: &[Value]) -> EngineResult<Value> {
        self.ensure_open()?;
        if source.contains("throw") {
            return Err(EngineError::fault(format!(
                "script threw during evaluation: {source}"
            )));
        }
        self.record(format!("evaluate {source}"));
        // Echo the first argument so round-trip tests can observe a value.
        Ok(args.first().cloned().unwrap_or(Value::Null))
    }

    fn wait_for(&mut self, request: &WaitRequest) -> EngineResult<()> {
        self.ensure_open()?;
        match request.selector.as_deref() {
            Some(selector) => self.check_selector(selector),
            None => {
                let delay = request.timeout_ms.unwrap_or(DEFAULT_WAIT_MS);
                thread::sleep(Duration::from_millis(delay));
                Ok(())
            }
        }
    }

    fn scroll(&mut self, request: &ScrollRequest) -> EngineResult<()> {
        self.ensure_open()?;
        if let Some(selector) = request.selector.as_deref() {
            self.check_selector(selector)?;
        }
        self.record(format!("scroll {},{}", request.dx, request.dy));
        Ok(())
    }

    fn select_option(&mut self, selector: &str, values: &[String]) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        self.check_selector(selector)?;
        self.record(format!("select {selector}"));
        Ok(values.to_vec())
    }

    fn hover(&mut self, selector: &str) -> EngineResult<()> {
        self.ensure_open()?;
        self.check_selector(selector)?;
        self.record(format!("hover {selector}"));
        Ok(())
    }

    fn read_html(&mut self, selector: Option<&str>) -> EngineResult<String> {
        self.ensure_open()?;
        if let Some(target) = selector {
            self.check_selector(target)?;
        }
        let page = self.current_page()?;
        Ok(format!(
            "<html><head><title>{}</title></head><body></body></html>",
            page.title
        ))
    }

    fn list_pages(&self) -> EngineResult<Vec<PageInfo>> {
        self.ensure_open()?;
        Ok(self
            .pages
            .iter()
            .map(|page| PageInfo {
                url: page.url.clone(),
                title: page.title.clone(),
            })
            .collect())
    }

    fn active_page(&self) -> EngineResult<usize> {
        self.ensure_open()?;
        Ok(self.current)
    }

    fn open_page(&mut self) -> EngineResult<usize> {
        self.ensure_open()?;
        self.pages.push(StubPage::blank());
        let index = self.pages.len() - 1;
        self.current = index;
        self.record(format!("open_page -> {index}"));
        Ok(index)
    }

    fn switch_page(&mut self, index: usize) -> EngineResult<()> {
        self.ensure_open()?;
        if index >= self.pages.len() {
            return Err(EngineError::fault(format!("no page at index {index}")));
        }
        self.current = index;
        self.record(format!("switch_page {index}"));
        Ok(())
    }

    fn close_page(&mut self, index: usize) -> EngineResult<usize> {
        self.ensure_open()?;
        if index >= self.pages.len() {
            return Err(EngineError::fault(format!("no page at index {index}")));
        }
        self.pages.remove(index);
        if index == self.current {
            // Closing the active page hands focus to the lowest survivor.
            self.current = 0;
        } else if index < self.current {
            self.current -= 1;
        }
        self.record(format!("close_page {index}"));
        Ok(self.pages.len())
    }

    fn open_window(&mut self, _viewport: Option<Viewport>) -> EngineResult<usize> {
        // The stub has no window concept; a window is one fresh page.
        self.open_page()
    }

    fn close(&mut self) -> EngineResult<()> {
        self.pages.clear();
        self.closed = true;
        Ok(())
    }
}

/// Provider yielding [`StubEngine`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubEngineProvider;

impl EngineProvider for StubEngineProvider {
    fn open(&self, _options: &EngineOptions) -> EngineResult<Box<dyn Engine>> {
        Ok(Box::new(StubEngine::new()))
    }
}
