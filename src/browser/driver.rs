use super::manager::BrowserError;
use super::{BrowserBackend, BrowserConfig, BrowserManager, PageSession};
use crate::config::BrowserSettings;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Timing and bounds for interactions
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub timeout: Duration,
    /// Quiet period that counts as network idle
    pub idle_quiet: Duration,
    /// Pause after every click or scroll
    pub interaction_wait: Duration,
    pub max_load_more: usize,
    pub max_scrolls: usize,
    /// Consecutive scrolls without a new item before stopping
    pub stall_limit: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&BrowserSettings::default())
    }
}

impl From<&BrowserSettings> for RenderOptions {
    fn from(s: &BrowserSettings) -> Self {
        Self {
            timeout: Duration::from_secs(s.timeout_secs),
            idle_quiet: Duration::from_millis(s.idle_quiet_ms),
            interaction_wait: Duration::from_millis(s.interaction_wait_ms),
            max_load_more: s.max_load_more,
            max_scrolls: s.max_scrolls,
            stall_limit: s.stall_limit.max(1),
        }
    }
}

/// UI steps run after navigation and before extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    WaitFor(String),
    Click(String),
    /// Click the control until it disappears or `max_load_more` is reached
    LoadMore { button: String },
    /// Scroll to the bottom until `stall_limit` scrolls in a row add no item
    ScrollUntilStable { item_selector: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Serialized DOM after the interactions
    Html,
    /// JavaScript expression evaluated in the page
    Script(String),
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    pub interactions: Vec<Interaction>,
    pub extraction: Extraction,
}

/// Closes the session when dropped, whatever path left the render.
struct SessionGuard(Box<dyn PageSession>);

impl Deref for SessionGuard {
    type Target = dyn PageSession;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Renders pages for one source adapter, one at a time.
pub struct RenderingDriver {
    backend: Arc<dyn BrowserBackend>,
    options: RenderOptions,
    serial: Mutex<()>,
}

impl RenderingDriver {
    pub fn new(backend: Arc<dyn BrowserBackend>, options: RenderOptions) -> Self {
        Self {
            backend,
            options,
            serial: Mutex::new(()),
        }
    }

    /// Chrome-backed driver built from `[browser]` settings
    pub fn from_settings(settings: &BrowserSettings, user_agent: &str) -> Self {
        let backend = Arc::new(BrowserManager::new(BrowserConfig::from_settings(
            settings, user_agent,
        )));
        Self::new(backend, RenderOptions::from(settings))
    }

    /// Another driver over the same backend with its own serial gate
    pub fn for_source(&self) -> Self {
        Self::new(self.backend.clone(), self.options.clone())
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Opens a session, navigates to `url`, waits for network idle and hands
    /// the page to `f`. The session is closed afterwards in all cases.
    pub async fn with_page<T, F>(&self, url: &str, f: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PageSession, &RenderOptions) -> Result<T, BrowserError> + Send + 'static,
    {
        let _turn = self.serial.lock().await;
        let backend = self.backend.clone();
        let options = self.options.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || {
            let mut session = SessionGuard(backend.open()?);
            log::debug!("Rendering {}", url);
            session.navigate(&url)?;
            if let Err(e) = session.wait_for_network_idle(options.idle_quiet, options.timeout) {
                log::debug!("Continuing without network idle on {}: {}", url, e);
            }
            f(&mut *session, &options)
        })
        .await
        .map_err(|e| BrowserError::TaskAborted(e.to_string()))?
    }

    pub async fn render(&self, request: RenderRequest) -> Result<serde_json::Value, BrowserError> {
        let RenderRequest {
            url,
            interactions,
            extraction,
        } = request;

        self.with_page(&url, move |page, options| {
            for interaction in &interactions {
                run_interaction(page, interaction, options)?;
            }
            match extraction {
                Extraction::Html => Ok(serde_json::Value::String(page.content()?)),
                Extraction::Script(script) => page.evaluate(&script),
            }
        })
        .await
    }

    pub async fn render_html(
        &self,
        url: &str,
        interactions: Vec<Interaction>,
    ) -> Result<String, BrowserError> {
        let value = self
            .render(RenderRequest {
                url: url.to_string(),
                interactions,
                extraction: Extraction::Html,
            })
            .await?;
        match value {
            serde_json::Value::String(html) => Ok(html),
            other => Err(BrowserError::HtmlExtractionError(format!(
                "expected html, got {}",
                other
            ))),
        }
    }
}

/// Performs one interaction. Returns how many clicks or scrolls it took.
pub fn run_interaction(
    page: &mut dyn PageSession,
    interaction: &Interaction,
    options: &RenderOptions,
) -> Result<usize, BrowserError> {
    match interaction {
        Interaction::WaitFor(selector) => {
            page.wait_for_selector(selector, options.timeout)?;
            Ok(0)
        }
        Interaction::Click(selector) => {
            if !page.click(selector)? {
                return Err(BrowserError::ElementNotFound(selector.clone()));
            }
            page.pause(options.interaction_wait);
            Ok(1)
        }
        Interaction::LoadMore { button } => {
            let mut clicks = 0;
            while clicks < options.max_load_more {
                if !page.click(button)? {
                    break;
                }
                clicks += 1;
                page.pause(options.interaction_wait);
            }
            log::debug!("Load-more clicked {} times", clicks);
            Ok(clicks)
        }
        Interaction::ScrollUntilStable { item_selector } => {
            let mut last = page.count(item_selector)?;
            let mut stalls = 0;
            let mut scrolls = 0;
            while scrolls < options.max_scrolls {
                page.scroll_to_bottom()?;
                scrolls += 1;
                page.pause(options.interaction_wait);

                let now = page.count(item_selector)?;
                if now > last {
                    last = now;
                    stalls = 0;
                } else {
                    stalls += 1;
                    if stalls >= options.stall_limit {
                        break;
                    }
                }
            }
            log::debug!("Scrolled {} times, {} items", scrolls, last);
            Ok(scrolls)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakePage};

    fn options() -> RenderOptions {
        RenderOptions {
            max_load_more: 10,
            max_scrolls: 30,
            stall_limit: 3,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_load_more_stops_when_button_disappears() {
        let browser = FakeBrowser::new();
        let mut page = browser.session(FakePage::listing(5, 5, 20));
        let clicks = run_interaction(
            &mut page,
            &Interaction::LoadMore {
                button: FakePage::LOAD_MORE.to_string(),
            },
            &options(),
        )
        .unwrap();
        assert_eq!(clicks, 3);
        assert_eq!(page.count(FakePage::ITEM).unwrap(), 20);
    }

    #[test]
    fn test_load_more_respects_max_attempts() {
        let browser = FakeBrowser::new();
        let mut page = browser.session(FakePage::listing(1, 1, 1000));
        let opts = RenderOptions {
            max_load_more: 4,
            ..options()
        };
        let clicks = run_interaction(
            &mut page,
            &Interaction::LoadMore {
                button: FakePage::LOAD_MORE.to_string(),
            },
            &opts,
        )
        .unwrap();
        assert_eq!(clicks, 4);
    }

    #[test]
    fn test_scroll_stall_detection() {
        let browser = FakeBrowser::new();
        // grows 4 -> 8 -> 12, then three scrolls without growth
        let mut page = browser.session(FakePage::listing(4, 4, 12));
        let scrolls = run_interaction(
            &mut page,
            &Interaction::ScrollUntilStable {
                item_selector: FakePage::ITEM.to_string(),
            },
            &options(),
        )
        .unwrap();
        assert_eq!(scrolls, 5);
    }

    #[test]
    fn test_click_on_missing_element_fails() {
        let browser = FakeBrowser::new();
        let mut page = browser.session(FakePage::listing(1, 0, 1));
        let click = Interaction::Click("#nope".to_string());
        let result = run_interaction(&mut page, &click, &options());
        assert!(matches!(result, Err(BrowserError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_render_html_closes_session() {
        let browser = FakeBrowser::new();
        browser.add_page("https://spa.test/", FakePage::listing(2, 2, 6));
        let driver = RenderingDriver::new(Arc::new(browser.clone()), options());

        let html = driver
            .render_html(
                "https://spa.test/",
                vec![Interaction::LoadMore {
                    button: FakePage::LOAD_MORE.to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(html.matches("class=\"product__item\"").count(), 6);
        assert_eq!(browser.opened(), 1);
        assert_eq!(browser.closed(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_on_navigation_error() {
        let browser = FakeBrowser::new();
        let driver = RenderingDriver::new(Arc::new(browser.clone()), options());

        let result = driver.render_html("https://unknown.test/", vec![]).await;
        assert!(matches!(result, Err(BrowserError::NavigationError(_))));
        assert_eq!(browser.closed(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_when_extraction_panics() {
        let browser = FakeBrowser::new();
        browser.add_page("https://spa.test/", FakePage::listing(1, 0, 1));
        let driver = RenderingDriver::new(Arc::new(browser.clone()), options());

        let result: Result<(), BrowserError> = driver
            .with_page("https://spa.test/", |_, _| panic!("extraction bug"))
            .await;
        assert!(matches!(result, Err(BrowserError::TaskAborted(_))));
        assert_eq!(browser.closed(), 1);
    }

    #[tokio::test]
    async fn test_script_extraction() {
        let browser = FakeBrowser::new();
        browser.add_page("https://spa.test/", FakePage::listing(3, 0, 3));
        let driver = RenderingDriver::new(Arc::new(browser), options());

        let value = driver
            .render(RenderRequest {
                url: "https://spa.test/".to_string(),
                interactions: vec![],
                extraction: Extraction::Script("count".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!(3));
    }
}
