//! Per-request browser sessions.
//!
//! A [`Browser`] opens one isolated page per scrape call; the [`Session`]
//! wrapper owns it for the duration of the call and must be closed on every
//! exit path. The browser engine is abstracted so crawlers can run against the
//! in-memory [`MemoryBrowser`] as well as Chromium.

pub mod chromium;
pub mod memory;
pub mod quiescence;

pub use chromium::ChromiumBrowser;
pub use memory::MemoryBrowser;

use crate::correlation::WidgetObserver;
use async_trait::async_trait;
use horseman_core::{HorsemanError, Result};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

/// What a session needs to be set up with before its first navigation.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Headers attached to every request the session issues.
    pub extra_headers: Vec<(String, String)>,
    /// Subscription for pricing widget responses.
    pub observer: Option<WidgetObserver>,
}

impl SessionOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_observer(mut self, observer: WidgetObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// A browser engine that can open isolated pages.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserPage>>;
}

/// A single page owned by one scrape call.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait until the network has been idle for the settle window.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// The rendered document.
    async fn content(&self) -> Result<String>;
    /// Release the page and everything behind it.
    async fn close(self: Box<Self>) -> Result<()>;
}

pub struct Session {
    page: Box<dyn BrowserPage>,
    loads: usize,
}

impl Session {
    pub async fn open(browser: &dyn Browser, options: SessionOptions) -> Result<Self> {
        let page = browser.open(options).await?;
        debug!("Browser session opened");
        Ok(Self { page, loads: 0 })
    }

    /// Navigate to `url`, wait for quiescence and return the rendered document.
    pub async fn load(&mut self, url: &str) -> Result<String> {
        info!("Loading {}", url);
        self.page.navigate(url).await?;
        self.loads += 1;
        self.page.content().await
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Tear the session down. Failures are logged, never returned, so they
    /// cannot mask the outcome of the work done in the session.
    pub async fn close(self) {
        let loads = self.loads;
        match self.page.close().await {
            Ok(()) => debug!("Browser session closed after {} loads", loads),
            Err(e) => warn!("Browser session did not close cleanly: {}", e),
        }
    }
}

/// Locate the embedded widget frame in a rendered document: the first
/// `iframe` whose resolved `src` starts with `prefix`.
pub fn find_widget_frame(html: &str, base: &Url, prefix: &str) -> Result<Option<Url>> {
    let document = Html::parse_document(html);
    let iframe_selector = Selector::parse("iframe[src]").map_err(|e| HorsemanError::Selector(e.to_string()))?;

    let frame = document
        .select(&iframe_selector)
        .filter_map(|frame| frame.value().attr("src"))
        .filter_map(|src| base.join(src.trim()).ok())
        .find(|src| src.as_str().starts_with(prefix));

    if frame.is_none() {
        debug!("No widget frame under {} in {}", prefix, base);
    }
    Ok(frame)
}
