//! Browser automation for sources whose pages are assembled client-side
//!
//! The rendering backend sits behind two small traits so it can be swapped
//! for a scripted fake in tests:
//!
//! - [`BrowserBackend`] opens an isolated session (one Chrome process per
//!   render, no pooling)
//! - [`PageSession`] drives that session: navigate, interact, evaluate
//!
//! [`RenderingDriver`] runs a whole render on a blocking thread and closes
//! the session on every exit path, panics included.
//!
//! # Example
//!
//! ```no_run
//! use rust_media_scraper::browser::{
//!     BrowserConfig, BrowserManager, Interaction, RenderOptions, RenderingDriver,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(BrowserManager::new(BrowserConfig::default()));
//! let driver = RenderingDriver::new(backend, RenderOptions::default());
//!
//! let html = driver
//!     .render_html("https://example.com", vec![Interaction::ScrollUntilStable {
//!         item_selector: "article".to_string(),
//!     }])
//!     .await?;
//! println!("Rendered {} bytes", html.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod manager;
pub mod scraper;

#[cfg(test)]
pub(crate) mod fake;

pub use config::BrowserConfig;
pub use driver::{Extraction, Interaction, RenderOptions, RenderRequest, RenderingDriver};
pub use manager::{BrowserError, BrowserManager};
pub use scraper::BrowserScraper;

use std::time::Duration;

/// Opens isolated rendering sessions.
pub trait BrowserBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn PageSession>, BrowserError>;
}

/// Blocking handle on one open page.
pub trait PageSession: Send {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    fn wait_for_network_idle(
        &mut self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Returns `false` when no (visible) element matched.
    fn click(&mut self, selector: &str) -> Result<bool, BrowserError>;

    fn click_nth(&mut self, selector: &str, index: usize) -> Result<bool, BrowserError>;

    fn count(&mut self, selector: &str) -> Result<usize, BrowserError>;

    fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    /// Evaluates a JavaScript expression and returns its JSON value.
    fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, BrowserError>;

    fn content(&mut self) -> Result<String, BrowserError>;

    fn pause(&mut self, duration: Duration);

    /// Must be safe to call more than once.
    fn close(&mut self);
}
