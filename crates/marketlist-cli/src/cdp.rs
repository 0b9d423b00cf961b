//! Chrome DevTools adapter for the core [`Page`] trait.
//!
//! The vendor API hands back a websocket endpoint for an already running
//! browser; we attach to it, open a fresh tab and drive it from a private
//! single-worker tokio runtime so the rest of the program stays blocking.

use anyhow::Context;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element;
use chromiumoxide::Browser;
use futures::StreamExt;
use marketlist_core::page::{Page, PageError, PageResult, WaitState};
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CdpPage {
    rt: Runtime,
    // Held so the connection outlives the page.
    _browser: Browser,
    page: chromiumoxide::Page,
    handler: JoinHandle<()>,
}

impl CdpPage {
    pub fn connect(ws_endpoint: &str) -> anyhow::Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("failed to start CDP runtime")?;
        let (browser, mut handler) = rt
            .block_on(Browser::connect(ws_endpoint))
            .with_context(|| format!("failed to connect to {ws_endpoint}"))?;
        let handler = rt.spawn(async move {
            while handler.next().await.is_some() {}
        });
        let page = rt
            .block_on(browser.new_page("about:blank"))
            .context("failed to open a tab")?;
        debug!(ws = ws_endpoint, "attached to browser");
        Ok(Self {
            rt,
            _browser: browser,
            page,
            handler,
        })
    }

    fn block<T, E: std::fmt::Display>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, E>>,
    ) -> PageResult<T> {
        self.rt.block_on(async {
            match tokio::time::timeout(COMMAND_TIMEOUT, fut).await {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(PageError::Driver(format!("{what}: {e}"))),
                Err(_) => Err(PageError::Driver(format!(
                    "{what}: no response within {}s",
                    COMMAND_TIMEOUT.as_secs()
                ))),
            }
        })
    }

    fn probe(&self, locator: &Locator) -> PageResult<Probe> {
        let result = self.block("evaluate", self.page.evaluate(locator.probe_js()))?;
        result
            .into_value::<Probe>()
            .map_err(|e| PageError::Driver(format!("probe result: {e}")))
    }

    fn element(&self, selector: &str) -> PageResult<Element> {
        let locator = Locator::parse(selector);
        if !self.probe(&locator)?.attached {
            return Err(PageError::NotFound(selector.to_string()));
        }
        match &locator {
            Locator::Css(css) => self.block("find element", self.page.find_element(css.as_str())),
            Locator::XPath(xpath) => self.block("find xpath", self.page.find_xpath(xpath.as_str())),
        }
    }

    fn eval(&self, js: String) -> PageResult<()> {
        self.block("evaluate", self.page.evaluate(js)).map(|_| ())
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl Page for CdpPage {
    fn navigate(&mut self, url: &str, timeout: Duration) -> PageResult<()> {
        self.rt.block_on(async {
            match tokio::time::timeout(timeout, self.page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(PageError::Driver(format!("navigate to {url}: {e}"))),
                Err(_) => Err(PageError::Driver(format!(
                    "navigate to {url}: no load within {}ms",
                    timeout.as_millis()
                ))),
            }
        })
    }

    fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> PageResult<()> {
        let locator = Locator::parse(selector);
        let started = Instant::now();
        loop {
            let probe = self.probe(&locator)?;
            let reached = match state {
                WaitState::Attached => probe.attached,
                WaitState::Detached => !probe.attached,
                WaitState::Visible => probe.visible,
                WaitState::Hidden => !probe.visible,
            };
            if reached {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(PageError::timeout(selector, state, waited));
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - waited));
        }
    }

    fn click(&mut self, selector: &str) -> PageResult<()> {
        let element = self.element(selector)?;
        self.block("click", element.click()).map(|_| ())
    }

    fn type_text(&mut self, selector: &str, text: &str) -> PageResult<()> {
        let element = self.element(selector)?;
        self.block("focus", element.click())?;
        self.eval(Locator::parse(selector).clear_js())?;
        self.block("type", element.type_str(text)).map(|_| ())
    }

    fn exists(&mut self, selector: &str) -> PageResult<bool> {
        Ok(self.probe(&Locator::parse(selector))?.attached)
    }

    fn set_files(&mut self, selector: &str, files: &[PathBuf]) -> PageResult<()> {
        let element = self.element(selector)?;
        let files = files
            .iter()
            .map(|f| {
                std::fs::canonicalize(f)
                    .unwrap_or_else(|_| f.clone())
                    .display()
                    .to_string()
            })
            .collect::<Vec<_>>();
        let mut params = SetFileInputFilesParams::new(files);
        params.backend_node_id = Some(element.backend_node_id.clone());
        self.block("set files", self.page.execute(params)).map(|_| ())
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn current_url(&mut self) -> Option<String> {
        self.rt.block_on(self.page.url()).ok().flatten()
    }
}

// ---------------------------------------------------------------------------
// Locators
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Probe {
    attached: bool,
    visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    fn parse(selector: &str) -> Self {
        let s = selector.trim();
        if let Some(rest) = s.strip_prefix("xpath=") {
            return Locator::XPath(rest.trim().to_string());
        }
        if let Some(rest) = s.strip_prefix("text=") {
            let text = rest.trim().trim_matches('"');
            return Locator::XPath(format!(
                "//*[normalize-space(text())={}]",
                xpath_literal(text)
            ));
        }
        if s.starts_with("//") || s.starts_with("(//") {
            return Locator::XPath(s.to_string());
        }
        Locator::Css(s.to_string())
    }

    /// JS expression evaluating to the first matching element or null.
    fn lookup_js(&self) -> String {
        // serde_json string encoding is a valid JS string literal.
        match self {
            Locator::Css(css) => format!(
                "document.querySelector({})",
                serde_json::Value::from(css.as_str())
            ),
            Locator::XPath(xpath) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                serde_json::Value::from(xpath.as_str())
            ),
        }
    }

    fn probe_js(&self) -> String {
        format!(
            "(() => {{ let el = null; try {{ el = {}; }} catch (e) {{ el = null; }} \
             if (!el) return {{ attached: false, visible: false }}; \
             const r = el.getBoundingClientRect(); const st = window.getComputedStyle(el); \
             return {{ attached: true, visible: r.width > 0 && r.height > 0 \
             && st.visibility !== 'hidden' && st.display !== 'none' }}; }})()",
            self.lookup_js()
        )
    }

    fn clear_js(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return false; \
             if ('value' in el) {{ el.value = ''; }} else {{ el.textContent = ''; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true; }})()",
            self.lookup_js()
        )
    }
}

/// Quote `s` as an XPath string literal, using concat() when it holds both
/// quote kinds.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_is_default() {
        assert_eq!(
            Locator::parse(" button[data-testid='sell'] "),
            Locator::Css("button[data-testid='sell']".into())
        );
    }

    #[test]
    fn xpath_forms() {
        assert_eq!(
            Locator::parse("xpath=//div[@id='a']"),
            Locator::XPath("//div[@id='a']".into())
        );
        assert_eq!(
            Locator::parse("(//li)[2]"),
            Locator::XPath("(//li)[2]".into())
        );
    }

    #[test]
    fn text_becomes_xpath() {
        assert_eq!(
            Locator::parse("text=List now"),
            Locator::XPath("//*[normalize-space(text())='List now']".into())
        );
        assert_eq!(
            Locator::parse("text=Men's"),
            Locator::XPath("//*[normalize-space(text())=\"Men's\"]".into())
        );
    }

    #[test]
    fn literal_with_both_quotes_uses_concat() {
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn lookup_escapes_selector() {
        let js = Locator::Css("a[title=\"x\"]".into()).lookup_js();
        assert_eq!(js, "document.querySelector(\"a[title=\\\"x\\\"]\")");
    }
}
