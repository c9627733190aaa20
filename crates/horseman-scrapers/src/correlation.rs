//! Joins a price scrape with the pricing widget call its page fires.
//!
//! Each scrape gets a fresh [`CorrelationToken`] that the browser sends as an
//! extra header on every request of that session. The widget echoes request
//! headers on its quote XHR, so the observer can read the token back off the
//! request itself and file the decoded payload under it. The scrape then takes
//! its own token out of the shared [`CorrelationCache`] once the page settles.

use horseman_core::{PriceQuote, TtlCache};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Recover a token from a header value. Blank values are not tokens.
    pub fn from_header_value(value: &str) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type CorrelationCache = TtlCache<CorrelationToken, PriceQuote>;

/// Case-insensitive header lookup on a CDP-style `{name: value}` header object.
pub fn header_value<'a>(headers: &'a serde_json::Value, name: &str) -> Option<&'a str> {
    headers
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

/// Response subscription registered on a session before it navigates.
#[derive(Clone)]
pub struct WidgetObserver {
    endpoint_prefix: String,
    header_name: String,
    cache: Arc<CorrelationCache>,
}

impl fmt::Debug for WidgetObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetObserver")
            .field("endpoint_prefix", &self.endpoint_prefix)
            .field("header_name", &self.header_name)
            .finish()
    }
}

impl WidgetObserver {
    pub fn new(endpoint_prefix: impl Into<String>, header_name: impl Into<String>, cache: Arc<CorrelationCache>) -> Self {
        Self {
            endpoint_prefix: endpoint_prefix.into(),
            header_name: header_name.into(),
            cache,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// The token carried by a widget request, or `None` when the request is
    /// not a GET to the widget endpoint or carries no token header.
    pub fn match_request(&self, method: &str, url: &str, headers: &serde_json::Value) -> Option<CorrelationToken> {
        if !method.eq_ignore_ascii_case("GET") || !url.starts_with(&self.endpoint_prefix) {
            return None;
        }
        let token = header_value(headers, &self.header_name).and_then(CorrelationToken::from_header_value);
        if token.is_none() {
            debug!("Widget request to {} carried no {} header", url, self.header_name);
        }
        token
    }

    /// Decode a widget response body and file it under `token`. Bodies that
    /// are not JSON are logged and dropped.
    pub fn record(&self, token: CorrelationToken, body: &[u8]) -> bool {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(payload) => {
                debug!("Captured widget payload for {}", token);
                self.cache.insert(token, PriceQuote::Widget(payload));
                true
            }
            Err(e) => {
                warn!("Widget response for {} is not JSON: {}", token, e);
                false
            }
        }
    }
}
