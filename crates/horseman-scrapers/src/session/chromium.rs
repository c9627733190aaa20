//! Chromium sessions over the DevTools protocol.
//!
//! Every `open` launches its own browser process with a throwaway profile
//! directory. A listener task follows the page's network events to track
//! in-flight requests and, when a [`WidgetObserver`] is attached, pulls the
//! bodies of pricing widget responses into the correlation cache.

use super::quiescence::{lock_activity, wait_for_quiescence, NetworkActivity, SharedActivity};
use super::{Browser, BrowserPage, SessionOptions};
use crate::correlation::{CorrelationToken, WidgetObserver};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, GetResponseBodyParams, Headers,
    SetExtraHttpHeadersParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use horseman_core::{HorsemanError, Result, ScraperConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Locate a Chrome or Chromium binary: the configured path first, then the
/// usual names on `PATH`.
pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.clone());
        }
        warn!("Configured Chrome executable {} does not exist", path.display());
    }

    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

const LAUNCH_ARGS: [&str; 5] = [
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    // keep cross-site widget frames in the page's own target
    "--disable-features=IsolateOrigins,site-per-process",
];

fn browser_error(context: &str, e: impl std::fmt::Display) -> HorsemanError {
    HorsemanError::Browser(format!("{}: {}", context, e))
}

#[derive(Debug, Clone)]
pub struct ChromiumBrowser {
    config: ScraperConfig,
}

impl ChromiumBrowser {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    fn launch_config(&self, profile: &TempDir) -> Result<BrowserConfig> {
        let executable = find_chromium(self.config.chrome_executable.as_ref())
            .ok_or_else(|| HorsemanError::Browser("no Chrome or Chromium executable found".to_string()))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(profile.path())
            .request_timeout(self.config.navigation_timeout())
            .args(LAUNCH_ARGS);
        if !self.config.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(|e| browser_error("invalid browser config", e))
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserPage>> {
        let profile = TempDir::new()?;
        let config = self.launch_config(&profile)?;

        let (mut browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| browser_error("failed to launch Chromium", e))?;
        let mut handler_task = TaskGuard::default();
        handler_task.push(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        let grace = self.config.navigation_timeout();

        let page = match prepare_page(&browser, &options).await {
            Ok(page) => page,
            Err(e) => {
                let _ = shut_down(&mut browser, grace).await;
                return Err(e);
            }
        };

        let activity: SharedActivity = Arc::new(Mutex::new(NetworkActivity::new()));
        let mut listener = TaskGuard::default();
        match spawn_network_listener(&page, Arc::clone(&activity), options.observer).await {
            Ok(task) => listener.push(task),
            Err(e) => {
                let _ = page.close().await;
                let _ = shut_down(&mut browser, grace).await;
                return Err(e);
            }
        }

        info!("Chromium session started");
        Ok(Box::new(ChromiumPage {
            browser,
            page,
            activity,
            settle: self.config.settle_window(),
            timeout: self.config.navigation_timeout(),
            listener,
            handler_task,
            _profile: profile,
        }))
    }
}

async fn prepare_page(browser: &CdpBrowser, options: &SessionOptions) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| browser_error("failed to create page", e))?;

    page.execute(EnableParams::default())
        .await
        .map_err(|e| browser_error("failed to enable network events", e))?;

    if !options.extra_headers.is_empty() {
        let headers: serde_json::Map<String, serde_json::Value> = options
            .extra_headers
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
            .collect();
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(serde_json::Value::Object(headers))))
            .await
            .map_err(|e| browser_error("failed to set extra headers", e))?;
    }

    Ok(page)
}

/// Follow request lifecycle events for `page`. Widget bodies are recorded
/// before their request counts as settled, so a page never reports quiescence
/// while a payload is still on its way into the cache.
async fn spawn_network_listener(
    page: &Page,
    activity: SharedActivity,
    observer: Option<WidgetObserver>,
) -> Result<JoinHandle<()>> {
    let mut started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| browser_error("failed to subscribe to requests", e))?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(|e| browser_error("failed to subscribe to finished loads", e))?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(|e| browser_error("failed to subscribe to failed loads", e))?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        let mut pending: HashMap<String, CorrelationToken> = HashMap::new();
        loop {
            // a request must be seen starting before its completion is handled
            tokio::select! {
                biased;
                Some(event) = started.next() => {
                    let request_id = event.request_id.inner().clone();
                    if let Some(observer) = &observer {
                        if let Some(token) = observer.match_request(
                            &event.request.method,
                            &event.request.url,
                            event.request.headers.inner(),
                        ) {
                            debug!("Widget request {} carries token {}", request_id, token);
                            pending.insert(request_id.clone(), token);
                        }
                    }
                    lock_activity(&activity).request_started(request_id);
                }
                Some(event) = finished.next() => {
                    let request_id = event.request_id.inner().clone();
                    if let (Some(observer), Some(token)) = (&observer, pending.remove(&request_id)) {
                        match fetch_body(&page, &event.request_id).await {
                            Ok(body) => {
                                observer.record(token, &body);
                            }
                            Err(e) => warn!("Could not read widget response {}: {}", request_id, e),
                        }
                    }
                    lock_activity(&activity).request_settled(&request_id);
                }
                Some(event) = failed.next() => {
                    let request_id = event.request_id.inner().clone();
                    if pending.remove(&request_id).is_some() {
                        warn!("Widget request {} failed: {}", request_id, event.error_text);
                    }
                    lock_activity(&activity).request_settled(&request_id);
                }
                else => break,
            }
        }
    }))
}

async fn fetch_body(
    page: &Page,
    request_id: &chromiumoxide::cdp::browser_protocol::network::RequestId,
) -> Result<Vec<u8>> {
    let response = page
        .execute(GetResponseBodyParams::new(request_id.clone()))
        .await
        .map_err(|e| browser_error("getResponseBody failed", e))?;

    if response.result.base64_encoded {
        general_purpose::STANDARD
            .decode(&response.result.body)
            .map_err(|e| browser_error("undecodable response body", e))
    } else {
        Ok(response.result.body.clone().into_bytes())
    }
}

/// Ask Chromium to exit through the CDP handler, killing the process when it
/// will not close or exit within `grace`. The handler task must still be
/// running when this is called.
async fn shut_down(browser: &mut CdpBrowser, grace: Duration) -> Result<()> {
    let closed = match tokio::time::timeout(grace, browser.close()).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(browser_error("failed to close browser", e)),
        Err(_) => Err(HorsemanError::Timeout(grace.as_millis() as u64)),
    };
    if let Err(e) = &closed {
        warn!("Graceful Chromium shutdown failed, killing it: {}", e);
        if let Some(Err(e)) = browser.kill().await {
            warn!("Failed to kill Chromium: {}", e);
        }
    }

    match tokio::time::timeout(grace, browser.wait()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Chromium did not exit cleanly: {}", e),
        Err(_) => {
            warn!("Chromium still running after {:?}, killing it", grace);
            if let Some(Err(e)) = browser.kill().await {
                warn!("Failed to kill Chromium: {}", e);
            }
        }
    }
    closed
}

/// Aborts every task it holds when dropped.
#[derive(Default)]
struct TaskGuard(Vec<JoinHandle<()>>);

impl TaskGuard {
    fn push(&mut self, task: JoinHandle<()>) {
        self.0.push(task);
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

struct ChromiumPage {
    browser: CdpBrowser,
    page: Page,
    activity: SharedActivity,
    settle: Duration,
    timeout: Duration,
    listener: TaskGuard,
    handler_task: TaskGuard,
    _profile: TempDir,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        lock_activity(&self.activity).touch();

        match tokio::time::timeout(self.timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(HorsemanError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(HorsemanError::Timeout(self.timeout.as_millis() as u64)),
        }

        wait_for_quiescence(&self.activity, self.settle, self.timeout).await
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| browser_error("failed to read document", e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumPage {
            mut browser,
            page,
            timeout,
            listener,
            handler_task,
            _profile,
            ..
        } = *self;

        // stop listening before the page goes away; the handler carries the
        // close command so it outlives the browser
        drop(listener);
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }
        let closed = shut_down(&mut browser, timeout).await;
        drop(handler_task);
        drop(_profile);
        closed
    }
}
