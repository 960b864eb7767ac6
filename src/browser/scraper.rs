use super::manager::BrowserError;
use super::PageSession;
use headless_chrome::{Browser, Tab};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One Chrome process with a single tab, driven through CDP
pub struct BrowserScraper {
    // Dropping the browser kills the process, so it lives as long as the tab.
    browser: Option<Browser>,
    tab: Arc<Tab>,
    default_timeout: Duration,
}

impl BrowserScraper {
    pub fn new(browser: Browser, tab: Arc<Tab>, default_timeout: Duration) -> Self {
        tab.set_default_timeout(default_timeout);
        Self {
            browser: Some(browser),
            tab,
            default_timeout,
        }
    }

    fn eval_raw(&self, script: &str) -> Result<Option<serde_json::Value>, BrowserError> {
        self.tab
            .evaluate(script, false)
            .map(|remote| remote.value)
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))
    }

    /// Waits while a Cloudflare interstitial ("Just a moment...") is shown
    fn wait_for_challenge(&self, timeout: Duration) -> Result<(), BrowserError> {
        let start = Instant::now();
        loop {
            let title = self.tab.get_title().unwrap_or_default().to_lowercase();
            if !title.contains("just a moment") {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(BrowserError::Timeout("Cloudflare challenge".to_string()));
            }
            std::thread::sleep(Duration::from_millis(500));
        }
    }
}

fn quote(selector: &str) -> String {
    serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
}

impl PageSession for BrowserScraper {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.tab
            .navigate_to(url)
            .map_err(|e| {
                BrowserError::NavigationError(format!("Failed to navigate to {}: {}", url, e))
            })?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| {
                BrowserError::NavigationError(format!("Navigation timeout for {}: {}", url, e))
            })?;
        self.wait_for_challenge(self.default_timeout)
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let script = format!("document.querySelector({}) !== null", quote(selector));
        let start = Instant::now();
        loop {
            if let Ok(Some(value)) = self.eval_raw(&script) {
                if value.as_bool() == Some(true) {
                    return Ok(());
                }
            }
            if start.elapsed() > timeout {
                return Err(BrowserError::Timeout(format!("Waiting for selector: {}", selector)));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Idle once the document is complete and the number of loaded
    /// resources has not changed for `quiet`.
    fn wait_for_network_idle(
        &mut self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let probe =
            "JSON.stringify([document.readyState, performance.getEntriesByType('resource').length])";
        let start = Instant::now();
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();

        loop {
            let sample = self
                .eval_raw(probe)?
                .and_then(|v| v.as_str().map(|s| s.to_string()))
                .and_then(|s| serde_json::from_str::<(String, u64)>(&s).ok());

            if let Some((state, count)) = sample {
                if last_count != Some(count) {
                    last_count = Some(count);
                    stable_since = Instant::now();
                } else if state == "complete" && stable_since.elapsed() >= quiet {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(BrowserError::Timeout("network idle".to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.click_nth(selector, 0)
    }

    fn click_nth(&mut self, selector: &str, index: usize) -> Result<bool, BrowserError> {
        let script = format!(
            r#"(function() {{
                const el = document.querySelectorAll({})[{}];
                if (!el || el.offsetParent === null && getComputedStyle(el).position !== 'fixed') return false;
                el.scrollIntoView({{block: 'center'}});
                el.click();
                return true;
            }})()"#,
            quote(selector),
            index
        );
        let clicked = self
            .eval_raw(&script)
            .map_err(|e| BrowserError::JavaScriptError(format!("Click failed: {}", e)))?;
        Ok(clicked.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        let script = format!("document.querySelectorAll({}).length", quote(selector));
        Ok(self
            .eval_raw(&script)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.eval_raw("window.scrollTo(0, document.body.scrollHeight); true")
            .map_err(|e| BrowserError::JavaScriptError(format!("Scroll failed: {}", e)))?;
        Ok(())
    }

    /// Runs `expression` in the page. The result goes through
    /// `JSON.stringify` because CDP returns objects by reference only.
    fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, BrowserError> {
        let script = format!("JSON.stringify((function() {{ return ({}); }})())", expression);
        match self.eval_raw(&script)? {
            Some(serde_json::Value::String(s)) => serde_json::from_str(&s)
                .map_err(|e| BrowserError::JavaScriptError(e.to_string())),
            _ => Ok(serde_json::Value::Null),
        }
    }

    fn content(&mut self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::HtmlExtractionError(e.to_string()))
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn close(&mut self) {
        if let Err(e) = self.tab.close(true) {
            log::debug!("Tab close failed: {}", e);
        }
        self.browser.take();
    }
}
