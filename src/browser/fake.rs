//! Scripted in-memory browser for driver and adapter tests

use super::manager::BrowserError;
use super::{BrowserBackend, PageSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A page whose item list grows on load-more clicks or scrolling, with an
/// optional set of stream servers that swap the player iframe when clicked.
#[derive(Clone)]
pub struct FakePage {
    items: usize,
    step: usize,
    max: usize,
    servers: Vec<(String, String)>,
    active_server: usize,
}

impl FakePage {
    pub const ITEM: &'static str = "div.product__item";
    pub const LOAD_MORE: &'static str = "#loadMoreButton";
    pub const SERVER: &'static str = "#changeServer option";
    pub const PLAYER: &'static str = "div#animeVideoPlayer iframe";

    pub fn listing(initial: usize, step: usize, max: usize) -> Self {
        Self {
            items: initial,
            step,
            max,
            servers: Vec::new(),
            active_server: 0,
        }
    }

    /// (label, iframe url) pairs; the first one is active on load
    pub fn with_servers(mut self, servers: &[(&str, &str)]) -> Self {
        self.servers = servers
            .iter()
            .map(|(n, u)| (n.to_string(), u.to_string()))
            .collect();
        self
    }

    fn grow(&mut self) -> bool {
        if self.items >= self.max {
            return false;
        }
        self.items = (self.items + self.step).min(self.max);
        true
    }

    fn render(&self) -> String {
        let mut html = String::from("<html><body>");
        html.push_str(r#"<div class="product__page">"#);
        for i in 1..=self.items {
            html.push_str(&format!(
                r#"<div class="product__item"><div class="product__item__text"><h5><a href="/anime/{i}/item-{i}">Item {i}</a></h5></div></div>"#
            ));
        }
        html.push_str("</div>");
        if self.items < self.max {
            html.push_str(r#"<button id="loadMoreButton">Load more</button>"#);
        }
        if !self.servers.is_empty() {
            html.push_str(r#"<select id="changeServer">"#);
            for (name, _) in &self.servers {
                html.push_str(&format!(r#"<option value="{0}">{0}</option>"#, name));
            }
            html.push_str("</select>");
            let (_, url) = &self.servers[self.active_server];
            html.push_str(&format!(
                r#"<div id="animeVideoPlayer"><iframe src="{}"></iframe></div>"#,
                url
            ));
        }
        html.push_str("</body></html>");
        html
    }
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    pages: Arc<Mutex<HashMap<String, FakePage>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        self.pages.lock().unwrap().insert(url.to_string(), page);
    }

    /// Session with `page` already loaded
    pub fn session(&self, page: FakePage) -> FakeSession {
        FakeSession {
            pages: self.pages.clone(),
            current: Some(page),
            closed: self.closed.clone(),
            is_closed: false,
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl BrowserBackend for FakeBrowser {
    fn open(&self) -> Result<Box<dyn PageSession>, BrowserError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            current: None,
            closed: self.closed.clone(),
            is_closed: false,
        }))
    }
}

pub struct FakeSession {
    pages: Arc<Mutex<HashMap<String, FakePage>>>,
    current: Option<FakePage>,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

impl FakeSession {
    fn page(&mut self) -> Result<&mut FakePage, BrowserError> {
        self.current
            .as_mut()
            .ok_or_else(|| BrowserError::NavigationError("no page loaded".to_string()))
    }
}

impl PageSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(page) => {
                self.current = Some(page);
                Ok(())
            }
            None => Err(BrowserError::NavigationError(format!("no such page: {}", url))),
        }
    }

    fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        if self.count(selector)? > 0 {
            Ok(())
        } else {
            Err(BrowserError::Timeout(format!("Waiting for selector: {}", selector)))
        }
    }

    fn wait_for_network_idle(
        &mut self,
        _quiet: Duration,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.click_nth(selector, 0)
    }

    fn click_nth(&mut self, selector: &str, index: usize) -> Result<bool, BrowserError> {
        let page = self.page()?;
        match selector {
            FakePage::LOAD_MORE if index == 0 => Ok(page.grow()),
            FakePage::SERVER if index < page.servers.len() => {
                page.active_server = index;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        let page = self.page()?;
        Ok(match selector {
            FakePage::ITEM => page.items,
            FakePage::SERVER => page.servers.len(),
            FakePage::LOAD_MORE => usize::from(page.items < page.max),
            _ => 0,
        })
    }

    fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.page()?.grow();
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self.page()?;
        match expression {
            "count" => Ok(serde_json::json!(page.items)),
            _ => Err(BrowserError::JavaScriptError(format!("unsupported: {}", expression))),
        }
    }

    fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.page()?.render())
    }

    fn pause(&mut self, _duration: Duration) {}

    fn close(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
