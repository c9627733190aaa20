//! A browser that serves canned documents from memory.
//!
//! Used to drive crawlers and runners without launching Chromium: each page
//! is registered by URL, and pricing widget calls can be scripted to fire when
//! a page loads so the correlation path runs end to end.

use super::{Browser, BrowserPage, SessionOptions};
use crate::correlation::WidgetObserver;
use async_trait::async_trait;
use horseman_core::{HorsemanError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct WidgetCall {
    url: String,
    body: String,
    echo_headers: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    opened: AtomicUsize,
    open: AtomicUsize,
    visits: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBrowser {
    pages: HashMap<String, String>,
    widget_calls: HashMap<String, Vec<WidgetCall>>,
    failing: HashSet<String>,
    state: Arc<MemoryState>,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Fire a widget GET to `widget_url` answering `body` whenever `page_url`
    /// loads. The request carries the session's extra headers.
    pub fn with_widget_call(mut self, page_url: impl Into<String>, widget_url: impl Into<String>, body: impl Into<String>) -> Self {
        self.widget_calls.entry(page_url.into()).or_default().push(WidgetCall {
            url: widget_url.into(),
            body: body.into(),
            echo_headers: true,
        });
        self
    }

    /// Like [`with_widget_call`](Self::with_widget_call) but the request goes
    /// out without the session's extra headers.
    pub fn with_headerless_widget_call(mut self, page_url: impl Into<String>, widget_url: impl Into<String>, body: impl Into<String>) -> Self {
        self.widget_calls.entry(page_url.into()).or_default().push(WidgetCall {
            url: widget_url.into(),
            body: body.into(),
            echo_headers: false,
        });
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Every URL navigated to, across all sessions, in order.
    pub fn visits(&self) -> Vec<String> {
        self.state
            .visits
            .lock()
            .map(|visits| visits.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Browser for MemoryBrowser {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserPage>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state.open.fetch_add(1, Ordering::SeqCst);

        let headers: serde_json::Map<String, serde_json::Value> = options
            .extra_headers
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();

        Ok(Box::new(MemoryPage {
            browser: self.clone(),
            headers: serde_json::Value::Object(headers),
            observer: options.observer,
            current: None,
        }))
    }
}

struct MemoryPage {
    browser: MemoryBrowser,
    headers: serde_json::Value,
    observer: Option<WidgetObserver>,
    current: Option<String>,
}

impl MemoryPage {
    fn fire_widget_calls(&self, page_url: &str) {
        let (Some(observer), Some(calls)) = (&self.observer, self.browser.widget_calls.get(page_url)) else {
            return;
        };
        let no_headers = serde_json::json!({});
        for call in calls {
            let headers = if call.echo_headers { &self.headers } else { &no_headers };
            if let Some(token) = observer.match_request("GET", &call.url, headers) {
                observer.record(token, call.body.as_bytes());
            }
        }
    }
}

#[async_trait]
impl BrowserPage for MemoryPage {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if let Ok(mut visits) = self.browser.state.visits.lock() {
            visits.push(url.to_string());
        }

        if self.browser.failing.contains(url) {
            return Err(HorsemanError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        if !self.browser.pages.contains_key(url) {
            return Err(HorsemanError::Navigation {
                url: url.to_string(),
                reason: "no such page".to_string(),
            });
        }

        self.fire_widget_calls(url);
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.current
            .as_ref()
            .and_then(|url| self.browser.pages.get(url))
            .cloned()
            .ok_or_else(|| HorsemanError::Browser("no document loaded".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.browser.state.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
