use super::config::BrowserConfig;
use super::scraper::BrowserScraper;
use super::{BrowserBackend, PageSession};
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;

/// Launches one Chrome process per rendering session.
///
/// Nothing is pooled: the process lives inside the returned
/// [`BrowserScraper`] and exits when that session is closed or dropped.
pub struct BrowserManager {
    config: BrowserConfig,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Build Chrome launch options from our config
    fn build_launch_options<'a>(
        config: &BrowserConfig,
        args: &'a [String],
    ) -> Result<LaunchOptions<'a>, BrowserError> {
        LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_size.0, config.window_size.1)))
            .idle_browser_timeout(config.timeout() * 4)
            .args(args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| BrowserError::ConfigurationError(e.to_string()))
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

impl BrowserBackend for BrowserManager {
    fn open(&self) -> Result<Box<dyn PageSession>, BrowserError> {
        let args = self.config.launch_args();
        let options = Self::build_launch_options(&self.config, &args)?;

        log::info!("Launching headless browser");
        let browser = Browser::new(options)
            .map_err(|e| BrowserError::InitializationError(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::TabCreationError(e.to_string()))?;

        Ok(Box::new(BrowserScraper::new(
            browser,
            tab,
            self.config.timeout(),
        )))
    }
}

/// Errors that can occur during browser operations
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    #[error("Browser configuration error: {0}")]
    ConfigurationError(String),

    #[error("Tab creation failed: {0}")]
    TabCreationError(String),

    #[error("Navigation error: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript execution error: {0}")]
    JavaScriptError(String),

    #[error("HTML extraction error: {0}")]
    HtmlExtractionError(String),

    #[error("Rendering task aborted: {0}")]
    TaskAborted(String),
}
