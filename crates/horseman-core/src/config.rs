use crate::{HorsemanError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by every embedded widget the booking site serves.
pub const DEFAULT_WIDGET_PREFIX: &str = "https://secure.ownerrez.com/widgets";
/// Prefix of the pricing widget's quote XHR.
pub const DEFAULT_QUOTE_PREFIX: &str = "https://secure.ownerrez.com/widgets/quote";
/// Booking request pages render the pricing table directly instead of through the widget.
pub const DEFAULT_BOOKING_REQUEST_BASE: &str = "https://booking.ownerrez.com/request";
/// Header carrying the correlation token; the widget echoes it on its XHRs.
pub const DEFAULT_CORRELATION_HEADER: &str = "X-Forwarded-Host";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub navigation_timeout_ms: u64,
    /// How long the network must stay idle before a page counts as settled.
    pub settle_window_ms: u64,
    pub correlation_ttl_secs: u64,
    pub correlation_capacity: usize,
    pub memo_capacity: usize,
    pub properties_ttl_secs: u64,
    pub reviews_ttl_secs: u64,
    pub rentals_ttl_secs: u64,
    pub availability_ttl_secs: u64,
    /// Shared secret callers must present. `None` disables the check.
    pub watermark: Option<String>,
    pub widget_prefix: String,
    pub quote_prefix: String,
    pub booking_request_base: String,
    pub correlation_header: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            navigation_timeout_ms: 30_000,
            settle_window_ms: 500,
            correlation_ttl_secs: 30,
            correlation_capacity: 32,
            memo_capacity: 128,
            properties_ttl_secs: 3600,
            reviews_ttl_secs: 3600,
            rentals_ttl_secs: 3600,
            availability_ttl_secs: 600,
            watermark: None,
            widget_prefix: DEFAULT_WIDGET_PREFIX.to_string(),
            quote_prefix: DEFAULT_QUOTE_PREFIX.to_string(),
            booking_request_base: DEFAULT_BOOKING_REQUEST_BASE.to_string(),
            correlation_header: DEFAULT_CORRELATION_HEADER.to_string(),
        }
    }
}

impl ScraperConfig {
    /// Defaults overlaid with any `HORSEMAN_*` environment variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(headless) = env_parse::<bool>("HORSEMAN_HEADLESS")? {
            config.headless = headless;
        }
        if let Ok(path) = env::var("HORSEMAN_CHROME_PATH") {
            config.chrome_executable = Some(PathBuf::from(path));
        }
        if let Some(ms) = env_parse("HORSEMAN_NAVIGATION_TIMEOUT_MS")? {
            config.navigation_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("HORSEMAN_SETTLE_WINDOW_MS")? {
            config.settle_window_ms = ms;
        }
        if let Some(secs) = env_parse("HORSEMAN_CORRELATION_TTL_SECS")? {
            config.correlation_ttl_secs = secs;
        }
        if let Some(capacity) = env_parse("HORSEMAN_CORRELATION_CAPACITY")? {
            config.correlation_capacity = capacity;
        }
        if let Some(capacity) = env_parse("HORSEMAN_MEMO_CAPACITY")? {
            config.memo_capacity = capacity;
        }
        if let Some(secs) = env_parse("HORSEMAN_PROPERTIES_TTL_SECS")? {
            config.properties_ttl_secs = secs;
        }
        if let Some(secs) = env_parse("HORSEMAN_REVIEWS_TTL_SECS")? {
            config.reviews_ttl_secs = secs;
        }
        if let Some(secs) = env_parse("HORSEMAN_RENTALS_TTL_SECS")? {
            config.rentals_ttl_secs = secs;
        }
        if let Some(secs) = env_parse("HORSEMAN_AVAILABILITY_TTL_SECS")? {
            config.availability_ttl_secs = secs;
        }
        if let Ok(watermark) = env::var("HORSEMAN_WATERMARK") {
            if !watermark.is_empty() {
                config.watermark = Some(watermark);
            }
        }

        Ok(config)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation_ttl_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| HorsemanError::Config(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
